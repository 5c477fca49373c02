//! Polling scheduler: scans stored reminders on a fixed cadence and
//! delivers exactly one notification per due occurrence.
//!
//! The loop is an explicitly cancellable periodic task (timer plus stop
//! signal), not a fire-and-forget timer: `start` spawns it, `stop` cancels
//! and awaits it, and the in-flight tick always completes before shutdown,
//! so `last_delivered` is never advanced for a reminder that was not
//! notified. Ticks are single-flight by construction -- the loop awaits each
//! tick before sleeping again.
//!
//! `tick` is public and takes the window bounds as arguments, so tests
//! drive it with a synthetic clock and never sleep wall-clock time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::notify::Notifier;
use crate::recurrence::due_in_window;
use crate::render::{fallback_message, MessageRenderer};
use crate::repository::ReminderRepository;

/// Errors from scheduler lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler already running")]
    AlreadyRunning,
}

/// Outcome counts for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Candidates returned by the store scan.
    pub scanned: usize,
    /// Reminders with an occurrence due inside the window.
    pub due: usize,
    /// Occurrences notified and recorded.
    pub delivered: usize,
    /// Due occurrences that failed to notify or record (retried next tick).
    pub failed: usize,
}

/// Periodic reminder delivery task.
///
/// Generic over the store, channel, and renderer capabilities. Constructed
/// once at startup and shared behind an `Arc`; the request path shares only
/// the store with it.
pub struct ReminderScheduler<R, N, M> {
    store: R,
    notifier: N,
    renderer: M,
    poll_interval: Duration,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<R, N, M> ReminderScheduler<R, N, M>
where
    R: ReminderRepository + Send + Sync + 'static,
    N: Notifier + Send + Sync + 'static,
    M: MessageRenderer + Send + Sync + 'static,
{
    pub fn new(store: R, notifier: N, renderer: M, poll_interval: Duration) -> Self {
        Self {
            store,
            notifier,
            renderer,
            poll_interval,
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Start the polling loop. Fails if already running.
    pub async fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let this = Arc::clone(self);
        *handle = Some(tokio::spawn(async move { this.run().await }));
        tracing::info!(interval_secs = self.poll_interval.as_secs(), "scheduler started");
        Ok(())
    }

    /// Stop the polling loop. The current tick, if any, finishes first.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let mut handle = self.handle.lock().await;
        if let Some(handle) = handle.take() {
            let _ = handle.await;
            tracing::info!("scheduler stopped");
        }
    }

    async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut previous_check: Option<DateTime<Utc>> = None;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    let now = Utc::now();
                    // Window-based due check: everything since the previous
                    // tick is still fair game, so a late tick misses nothing.
                    let window_start = previous_check.unwrap_or(now);
                    let summary = self.tick(window_start, now).await;
                    if summary.due > 0 || summary.failed > 0 {
                        tracing::info!(
                            scanned = summary.scanned,
                            due = summary.due,
                            delivered = summary.delivered,
                            failed = summary.failed,
                            "scheduler tick"
                        );
                    }
                    previous_check = Some(now);
                }
            }
        }
    }

    /// Run one scan over `[window_start, window_end]`.
    ///
    /// Failures are isolated per reminder: a store, render, or send failure
    /// for one reminder never aborts the rest of the scan. A send failure
    /// leaves `last_delivered` untouched, so the occurrence is due again on
    /// the next tick.
    pub async fn tick(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> TickSummary {
        let candidates = match self.store.find_due_candidates(window_end.date_naive()).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(error = %e, "due-candidate scan failed");
                return TickSummary::default();
            }
        };

        let mut summary = TickSummary {
            scanned: candidates.len(),
            ..TickSummary::default()
        };

        for reminder in candidates {
            let Some(occurrence) = due_in_window(&reminder, window_start, window_end) else {
                continue;
            };
            summary.due += 1;

            let message = match self.renderer.render(&reminder).await {
                Ok(message) if !message.trim().is_empty() => message,
                Ok(_) => fallback_message(&reminder),
                Err(e) => {
                    tracing::warn!(
                        reminder_id = %reminder.id,
                        error = %e,
                        "renderer failed, using template fallback"
                    );
                    fallback_message(&reminder)
                }
            };

            match self.notifier.send(&reminder.owner, &message).await {
                Ok(()) => match self.store.mark_delivered(&reminder.id, occurrence).await {
                    Ok(advanced) => {
                        if !advanced {
                            tracing::debug!(
                                reminder_id = %reminder.id,
                                "occurrence already recorded"
                            );
                        }
                        summary.delivered += 1;
                    }
                    Err(e) => {
                        tracing::error!(
                            reminder_id = %reminder.id,
                            error = %e,
                            "failed to record delivery"
                        );
                        summary.failed += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        reminder_id = %reminder.id,
                        error = %e,
                        "notification failed, occurrence stays due"
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use remynd_types::reminder::{no_expiry, Frequency, ReminderSpec};

    use crate::render::TemplateRenderer;
    use crate::router::CommandRouter;
    use crate::test_support::{FailingRenderer, MemoryStore, RecordingNotifier, ScriptedExtractor};

    const OWNER: &str = "whatsapp:+15550001111";

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn spec(task: &str, frequency: Frequency, start: NaiveDate, time: NaiveTime) -> ReminderSpec {
        ReminderSpec {
            task: task.to_string(),
            frequency,
            start_date: start,
            end_date: no_expiry(),
            time_of_day: time,
        }
    }

    fn scheduler(
        store: MemoryStore,
        notifier: RecordingNotifier,
    ) -> Arc<ReminderScheduler<MemoryStore, RecordingNotifier, TemplateRenderer>> {
        Arc::new(ReminderScheduler::new(
            store,
            notifier,
            TemplateRenderer,
            Duration::from_secs(60),
        ))
    }

    #[tokio::test]
    async fn test_tick_delivers_due_reminder_once() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        let created = store
            .create(
                &spec(
                    "call mom",
                    Frequency::Once,
                    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                ),
                OWNER,
            )
            .await
            .unwrap();
        let scheduler = scheduler(store.clone(), notifier.clone());

        // Before the occurrence: nothing
        let before = at(2024, 1, 2, 16, 59);
        let summary = scheduler.tick(before, before).await;
        assert_eq!(summary.due, 0);
        assert!(notifier.sent().is_empty());

        // At the occurrence: exactly one notification, delivery recorded
        let due_at = at(2024, 1, 2, 17, 0);
        let summary = scheduler.tick(due_at, due_at).await;
        assert_eq!(summary, TickSummary { scanned: 1, due: 1, delivered: 1, failed: 0 });
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, OWNER);
        assert_eq!(sent[0].1, "Reminder: call mom at 17:00 on 2024-01-02.");

        let stored = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.last_delivered, Some(due_at));

        // Same window again, and any later window: never again
        let summary = scheduler.tick(due_at, due_at).await;
        assert_eq!(summary.due, 0);
        let next_day = at(2024, 1, 3, 17, 0);
        let summary = scheduler.tick(next_day, next_day).await;
        assert_eq!(summary.due, 0);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_daily_reminder_fires_each_day() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        store
            .create(
                &spec(
                    "stretch",
                    Frequency::Daily,
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                ),
                OWNER,
            )
            .await
            .unwrap();
        let scheduler = scheduler(store, notifier.clone());

        let day1 = at(2024, 1, 5, 9, 0);
        assert_eq!(scheduler.tick(day1, day1).await.delivered, 1);

        // Later the same day: suppressed
        let later = at(2024, 1, 5, 13, 0);
        assert_eq!(scheduler.tick(at(2024, 1, 5, 9, 1), later).await.due, 0);

        // Next day: due again
        let day2 = at(2024, 1, 6, 9, 0);
        assert_eq!(scheduler.tick(day2, day2).await.delivered, 1);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_send_failure_does_not_advance_and_retries_next_tick() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        let created = store
            .create(
                &spec(
                    "call mom",
                    Frequency::Once,
                    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                ),
                OWNER,
            )
            .await
            .unwrap();
        let scheduler = scheduler(store.clone(), notifier.clone());

        notifier.set_failing(true);
        let due_at = at(2024, 1, 2, 17, 0);
        let summary = scheduler.tick(due_at, due_at).await;
        assert_eq!(summary, TickSummary { scanned: 1, due: 1, delivered: 0, failed: 1 });
        assert!(store.get(&created.id).await.unwrap().unwrap().last_delivered.is_none());

        // Channel recovers; the next tick's window still covers the occurrence
        notifier.set_failing(false);
        let retry_at = at(2024, 1, 2, 17, 1);
        let summary = scheduler.tick(due_at, retry_at).await;
        assert_eq!(summary.delivered, 1);
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(
            store.get(&created.id).await.unwrap().unwrap().last_delivered,
            Some(due_at)
        );
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_reminder() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        // Two owners due in the same minute; one owner's channel is down.
        store
            .create(
                &spec(
                    "one",
                    Frequency::Daily,
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                ),
                OWNER,
            )
            .await
            .unwrap();
        store
            .create(
                &spec(
                    "two",
                    Frequency::Daily,
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                ),
                "whatsapp:+15559998888",
            )
            .await
            .unwrap();
        notifier.fail_for_owner(OWNER);
        let scheduler = scheduler(store, notifier.clone());

        let due_at = at(2024, 1, 5, 9, 0);
        let summary = scheduler.tick(due_at, due_at).await;
        assert_eq!(summary.due, 2);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 1);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "whatsapp:+15559998888");
    }

    #[tokio::test]
    async fn test_renderer_failure_falls_back_to_template() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        store
            .create(
                &spec(
                    "call mom",
                    Frequency::Once,
                    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                ),
                OWNER,
            )
            .await
            .unwrap();
        let scheduler = Arc::new(ReminderScheduler::new(
            store,
            notifier.clone(),
            FailingRenderer,
            Duration::from_secs(60),
        ));

        let due_at = at(2024, 1, 2, 17, 0);
        let summary = scheduler.tick(due_at, due_at).await;
        assert_eq!(summary.delivered, 1);
        assert_eq!(
            notifier.sent()[0].1,
            "Reminder: call mom at 17:00 on 2024-01-02."
        );
    }

    #[tokio::test]
    async fn test_start_twice_fails_and_stop_is_clean() {
        let scheduler = scheduler(MemoryStore::new(), RecordingNotifier::new());
        scheduler.start().await.unwrap();
        assert!(matches!(
            scheduler.start().await,
            Err(SchedulerError::AlreadyRunning)
        ));
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let scheduler = scheduler(MemoryStore::new(), RecordingNotifier::new());
        scheduler.stop().await;
    }

    // -------------------------------------------------------------------
    // End-to-end: router-created reminder flows through the scheduler
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_call_mom_scenario() {
        let store = MemoryStore::new();
        let reply_notifier = RecordingNotifier::new();
        let extractor = ScriptedExtractor::new();
        let router = CommandRouter::new(extractor.clone(), store.clone(), reply_notifier.clone());

        // "remind me to call mom tomorrow at 5pm" with now = 2024-01-01 10:00
        extractor.push_ok(spec(
            "call mom",
            Frequency::Once,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        ));
        let reply = router
            .handle_message(OWNER, "remind me to call mom tomorrow at 5pm")
            .await
            .unwrap();
        assert_eq!(reply, "Reminder set: call mom at 17:00 on 2024-01-02.");

        // Scheduler notifies exactly once at 2024-01-02 17:00 and never again
        let delivery_notifier = RecordingNotifier::new();
        let scheduler = Arc::new(ReminderScheduler::new(
            store.clone(),
            delivery_notifier.clone(),
            TemplateRenderer,
            Duration::from_secs(60),
        ));
        let due_at = at(2024, 1, 2, 17, 0);
        assert_eq!(scheduler.tick(due_at, due_at).await.delivered, 1);
        assert_eq!(scheduler.tick(due_at, due_at).await.due, 0);
        assert_eq!(delivery_notifier.sent().len(), 1);

        // "delete call mom" removes it; a second delete finds nothing
        let reply = router.handle_message(OWNER, "delete call mom").await.unwrap();
        assert_eq!(reply, "Reminder for 'call mom' has been deleted.");
        let reply = router.handle_message(OWNER, "delete call mom").await.unwrap();
        assert_eq!(reply, "No reminder found for 'call mom'.");
    }
}
