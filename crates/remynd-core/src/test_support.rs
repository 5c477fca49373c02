//! In-process capability fakes shared by router and scheduler tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};

use remynd_types::error::{ExtractError, NotifyError, RenderError, RepositoryError};
use remynd_types::reminder::{Reminder, ReminderId, ReminderSpec};

use crate::extract::Extractor;
use crate::notify::Notifier;
use crate::render::MessageRenderer;
use crate::repository::ReminderRepository;

/// In-memory reminder store. Cloning shares the underlying map, so a router
/// and a scheduler can operate on the same data in one test.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<HashMap<ReminderId, Reminder>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl ReminderRepository for MemoryStore {
    async fn create(&self, spec: &ReminderSpec, owner: &str) -> Result<Reminder, RepositoryError> {
        let now = Utc::now();
        let reminder = Reminder {
            id: ReminderId::new(),
            owner: owner.to_string(),
            task: spec.task.clone(),
            frequency: spec.frequency,
            start_date: spec.start_date,
            end_date: spec.end_date,
            time_of_day: spec.time_of_day,
            last_delivered: None,
            created_at: now,
            updated_at: now,
        };
        self.rows
            .lock()
            .unwrap()
            .insert(reminder.id.clone(), reminder.clone());
        Ok(reminder)
    }

    async fn get(&self, id: &ReminderId) -> Result<Option<Reminder>, RepositoryError> {
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn find_by_owner(&self, owner: &str) -> Result<Vec<Reminder>, RepositoryError> {
        let mut found: Vec<Reminder> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(found)
    }

    async fn find_by_owner_and_task(
        &self,
        owner: &str,
        fragment: &str,
    ) -> Result<Vec<Reminder>, RepositoryError> {
        let fragment = fragment.to_lowercase();
        let mut found: Vec<Reminder> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.owner == owner && r.task.to_lowercase().contains(&fragment))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(found)
    }

    async fn find_due_candidates(&self, as_of: NaiveDate) -> Result<Vec<Reminder>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.end_date >= as_of)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: &ReminderId,
        spec: &ReminderSpec,
    ) -> Result<Reminder, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let reminder = rows.get_mut(id).ok_or(RepositoryError::NotFound)?;
        reminder.task = spec.task.clone();
        reminder.frequency = spec.frequency;
        reminder.start_date = spec.start_date;
        reminder.end_date = spec.end_date;
        reminder.time_of_day = spec.time_of_day;
        reminder.updated_at = Utc::now();
        Ok(reminder.clone())
    }

    async fn delete(&self, id: &ReminderId) -> Result<(), RepositoryError> {
        self.rows
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn mark_delivered(
        &self,
        id: &ReminderId,
        occurrence: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let reminder = rows.get_mut(id).ok_or(RepositoryError::NotFound)?;
        match reminder.last_delivered {
            Some(existing) if existing >= occurrence => Ok(false),
            _ => {
                reminder.last_delivered = Some(occurrence);
                Ok(true)
            }
        }
    }
}

/// Extractor fake that replays a queue of scripted results.
#[derive(Clone, Default)]
pub struct ScriptedExtractor {
    responses: Arc<Mutex<VecDeque<Result<ReminderSpec, ExtractError>>>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, spec: ReminderSpec) {
        self.responses.lock().unwrap().push_back(Ok(spec));
    }

    pub fn push_err(&self, err: ExtractError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }
}

impl Extractor for ScriptedExtractor {
    async fn extract(&self, _text: &str, _now: DateTime<Utc>) -> Result<ReminderSpec, ExtractError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExtractError::Backend("no scripted response".to_string())))
    }
}

/// Notifier fake that records every send and can be flipped into failure,
/// globally or for a single owner.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    failing: Arc<AtomicBool>,
    failing_owner: Arc<Mutex<Option<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fail_for_owner(&self, owner: &str) {
        *self.failing_owner.lock().unwrap() = Some(owner.to_string());
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn send(&self, owner: &str, message: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("scripted outage".to_string()));
        }
        if self.failing_owner.lock().unwrap().as_deref() == Some(owner) {
            return Err(NotifyError::Rejected(format!("unreachable owner {owner}")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((owner.to_string(), message.to_string()));
        Ok(())
    }
}

/// Renderer fake that always fails, forcing the fallback template.
#[derive(Clone, Default)]
pub struct FailingRenderer;

impl MessageRenderer for FailingRenderer {
    async fn render(&self, _reminder: &Reminder) -> Result<String, RenderError> {
        Err(RenderError::Backend("scripted outage".to_string()))
    }
}
