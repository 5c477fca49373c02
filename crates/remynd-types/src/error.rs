use chrono::NaiveDate;
use thiserror::Error;

/// Errors related to reminder domain validation.
#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("reminder not found")]
    NotFound,

    #[error("task must not be empty")]
    EmptyTask,

    #[error("start date {start} is after end date {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors from repository operations (used by trait definitions in remynd-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the text-understanding extraction capability.
///
/// Any shape violation in the backend's output is an error here, never a
/// partial reminder.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The backend call itself failed (network, auth, provider outage).
    #[error("extraction backend error: {0}")]
    Backend(String),

    /// The backend answered but the output was not parseable.
    #[error("malformed extraction output: {0}")]
    Malformed(String),

    /// The output parsed but violated the spec shape (bad date, unknown
    /// frequency, inverted window, empty task).
    #[error("invalid reminder spec: {0}")]
    Invalid(String),
}

/// Errors from the outbound notification channel.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The channel accepted the request but rejected the message.
    #[error("send rejected by channel: {0}")]
    Rejected(String),

    /// The channel could not be reached.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors from the message rendering capability.
///
/// Render failures never fail a delivery; the scheduler falls back to a
/// deterministic template.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render backend error: {0}")]
    Backend(String),

    #[error("empty rendered message")]
    Empty,
}
