//! Inbound command routing.
//!
//! Classifies a normalized (trimmed, case-folded) message into an intent and
//! dispatches to the matching handler: greetings and thanks get static
//! replies, `list`/`delete`/`update` operate on the owner's stored
//! reminders, and anything else is treated as a new-reminder request via the
//! extractor. Every branch produces exactly one reply string and sends it
//! through the notifier exactly once.
//!
//! Substring matching for delete/update is a documented limitation: delete
//! removes every match; update requires exactly one match and asks the user
//! to be more specific otherwise.

use chrono::Utc;

use remynd_types::error::{NotifyError, RepositoryError};
use remynd_types::reminder::Reminder;

use crate::extract::Extractor;
use crate::notify::Notifier;
use crate::repository::ReminderRepository;

/// Fixed apology when extraction cannot produce a valid spec.
const REPLY_CANNOT_UNDERSTAND: &str =
    "Sorry, I couldn't understand your reminder. Please try again.";

const REPLY_CANNOT_UNDERSTAND_UPDATE: &str =
    "Sorry, I couldn't understand the update. Please try again.";

const REPLY_GREETING: &str = "Hello! How can I assist you today?";

const REPLY_THANKS: &str = "You're welcome! Let me know if you need anything else.";

const REPLY_NO_REMINDERS: &str = "You have no reminders set.";

/// Classified intent of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Thanks,
    List,
    Delete(String),
    Update(String),
    Create,
}

/// Classify normalized text into an [`Intent`], in priority order.
pub fn classify(normalized: &str) -> Intent {
    if matches!(normalized, "hi" | "hello" | "hey") {
        return Intent::Greeting;
    }
    if normalized.contains("thank you") || normalized.contains("thanks") {
        return Intent::Thanks;
    }
    if normalized.contains("list all reminders")
        || normalized.contains("give me all reminders")
        || normalized.contains("list my reminders")
        || normalized == "list reminders"
    {
        return Intent::List;
    }
    if let Some(fragment) = normalized.strip_prefix("delete") {
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            return Intent::Delete(fragment.to_string());
        }
    }
    if let Some(fragment) = normalized.strip_prefix("update") {
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            return Intent::Update(fragment.to_string());
        }
    }
    Intent::Create
}

/// Errors surfaced to the transport layer. Extraction failures are handled
/// inside the router (fixed apology reply); only store and reply-delivery
/// failures escape.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("store failure: {0}")]
    Store(#[from] RepositoryError),

    #[error("reply delivery failure: {0}")]
    Notify(#[from] NotifyError),
}

/// Routes inbound messages to reminder operations.
///
/// Generic over the capability traits so tests can substitute deterministic
/// fakes for the text-understanding backend, the store, and the channel.
pub struct CommandRouter<E, R, N> {
    extractor: E,
    store: R,
    notifier: N,
}

impl<E, R, N> CommandRouter<E, R, N>
where
    E: Extractor,
    R: ReminderRepository,
    N: Notifier,
{
    pub fn new(extractor: E, store: R, notifier: N) -> Self {
        Self {
            extractor,
            store,
            notifier,
        }
    }

    /// Handle one inbound message and send the reply to its sender.
    ///
    /// Returns the reply text; the caller owns transport-level
    /// acknowledgment. Failures in one owner's flow never touch another's
    /// data -- every store access below is keyed by `owner`.
    #[tracing::instrument(skip(self, text), fields(owner = %owner))]
    pub async fn handle_message(&self, owner: &str, text: &str) -> Result<String, RouterError> {
        let normalized = text.trim().to_lowercase();

        let reply = match classify(&normalized) {
            Intent::Greeting => REPLY_GREETING.to_string(),
            Intent::Thanks => REPLY_THANKS.to_string(),
            Intent::List => self.list_reminders(owner).await?,
            Intent::Delete(fragment) => self.delete_reminders(owner, &fragment).await?,
            Intent::Update(fragment) => self.update_reminder(owner, &fragment).await?,
            Intent::Create => self.create_reminder(owner, &normalized).await?,
        };

        if let Err(e) = self.notifier.send(owner, &reply).await {
            tracing::error!(error = %e, "failed to deliver reply");
            return Err(e.into());
        }
        Ok(reply)
    }

    async fn create_reminder(&self, owner: &str, text: &str) -> Result<String, RouterError> {
        let spec = match self.extractor.extract(text, Utc::now()).await {
            Ok(spec) => spec,
            Err(e) => {
                tracing::warn!(error = %e, "extraction failed");
                return Ok(REPLY_CANNOT_UNDERSTAND.to_string());
            }
        };

        let reminder = self.store.create(&spec, owner).await?;
        tracing::info!(reminder_id = %reminder.id, "reminder created");
        Ok(format!(
            "Reminder set: {} at {} on {}.",
            reminder.task,
            reminder.time_of_day.format("%H:%M"),
            reminder.start_date.format("%Y-%m-%d"),
        ))
    }

    async fn list_reminders(&self, owner: &str) -> Result<String, RouterError> {
        let reminders = self.store.find_by_owner(owner).await?;
        if reminders.is_empty() {
            return Ok(REPLY_NO_REMINDERS.to_string());
        }

        let lines: Vec<String> = reminders.iter().map(describe).collect();
        Ok(format!("Your reminders:\n{}", lines.join("\n")))
    }

    async fn delete_reminders(&self, owner: &str, fragment: &str) -> Result<String, RouterError> {
        let matches = self.store.find_by_owner_and_task(owner, fragment).await?;
        if matches.is_empty() {
            return Ok(format!("No reminder found for '{fragment}'."));
        }

        let count = matches.len();
        for reminder in &matches {
            self.store.delete(&reminder.id).await?;
        }
        tracing::info!(count, "reminders deleted");

        if count == 1 {
            Ok(format!("Reminder for '{fragment}' has been deleted."))
        } else {
            Ok(format!("Deleted {count} reminders matching '{fragment}'."))
        }
    }

    async fn update_reminder(&self, owner: &str, fragment: &str) -> Result<String, RouterError> {
        let matches = self.store.find_by_owner_and_task(owner, fragment).await?;
        let target = match matches.as_slice() {
            [] => return Ok(format!("No reminder found for '{fragment}'.")),
            [one] => one,
            _ => {
                return Ok(format!(
                    "Multiple reminders match '{fragment}'. Please be more specific."
                ));
            }
        };

        let spec = match self.extractor.extract(fragment, Utc::now()).await {
            Ok(spec) => spec,
            Err(e) => {
                tracing::warn!(error = %e, "extraction failed for update");
                return Ok(REPLY_CANNOT_UNDERSTAND_UPDATE.to_string());
            }
        };

        let updated = self.store.update(&target.id, &spec).await?;
        tracing::info!(reminder_id = %updated.id, "reminder updated");
        Ok(format!(
            "Reminder updated: {} at {} on {}.",
            updated.task,
            updated.time_of_day.format("%H:%M"),
            updated.start_date.format("%Y-%m-%d"),
        ))
    }
}

fn describe(reminder: &Reminder) -> String {
    format!(
        "{} at {} on {} ({})",
        reminder.task,
        reminder.time_of_day.format("%H:%M"),
        reminder.start_date.format("%Y-%m-%d"),
        reminder.frequency,
    )
}
