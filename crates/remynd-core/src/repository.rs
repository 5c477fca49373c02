//! Reminder repository trait definition (port).
//!
//! Implementations live in remynd-infra (e.g., SqliteReminderRepository).
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
//! Every operation is a single atomic storage action; the request path and
//! the scheduler share nothing but this interface.

use chrono::{DateTime, NaiveDate, Utc};

use remynd_types::error::RepositoryError;
use remynd_types::reminder::{Reminder, ReminderId, ReminderSpec};

/// Repository trait for reminder persistence.
pub trait ReminderRepository: Send + Sync {
    /// Persist a new reminder for `owner` from an extracted spec.
    /// Returns the stored record with its assigned id.
    fn create(
        &self,
        spec: &ReminderSpec,
        owner: &str,
    ) -> impl std::future::Future<Output = Result<Reminder, RepositoryError>> + Send;

    /// Fetch a reminder by id.
    fn get(
        &self,
        id: &ReminderId,
    ) -> impl std::future::Future<Output = Result<Option<Reminder>, RepositoryError>> + Send;

    /// All reminders belonging to `owner`.
    fn find_by_owner(
        &self,
        owner: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Reminder>, RepositoryError>> + Send;

    /// `owner`'s reminders whose task contains `fragment`
    /// (case-insensitive substring).
    fn find_by_owner_and_task(
        &self,
        owner: &str,
        fragment: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Reminder>, RepositoryError>> + Send;

    /// All reminders still capable of producing occurrences on or after
    /// `as_of` (`end_date >= as_of`). The scheduler's scan set.
    fn find_due_candidates(
        &self,
        as_of: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Vec<Reminder>, RepositoryError>> + Send;

    /// Replace all mutable fields of a reminder in one statement.
    /// Returns the updated record.
    fn update(
        &self,
        id: &ReminderId,
        spec: &ReminderSpec,
    ) -> impl std::future::Future<Output = Result<Reminder, RepositoryError>> + Send;

    /// Permanently delete a reminder by id.
    fn delete(
        &self,
        id: &ReminderId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Record that `occurrence` was notified.
    ///
    /// Monotonic and idempotent: the stored `last_delivered` only ever moves
    /// forward, and re-recording the same occurrence is a no-op. Returns
    /// `true` if the record advanced, `false` if it was already at or past
    /// `occurrence`.
    fn mark_delivered(
        &self,
        id: &ReminderId,
        occurrence: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
