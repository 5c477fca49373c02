//! Text-understanding capability trait and output shape validation.
//!
//! The backing service may be a non-deterministic language model, but its
//! output shape is not negotiable: all five fields must be present (after
//! defaults), dates and time parseable, frequency recognized. Any violation
//! is an [`ExtractError`], never a partial reminder. The validation lives
//! here so every implementation -- and every test fake -- goes through the
//! same gate.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use remynd_types::error::ExtractError;
use remynd_types::reminder::{default_time_of_day, no_expiry, Frequency, ReminderSpec};

/// Trait for text-understanding backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in remynd-infra (e.g., `LlmExtractor`); tests
/// substitute deterministic fakes.
pub trait Extractor: Send + Sync {
    /// Turn free-form `text` into a structured reminder spec.
    ///
    /// `now` anchors relative expressions ("tomorrow", "next week") and the
    /// extraction defaults.
    fn extract(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<ReminderSpec, ExtractError>> + Send;
}

/// Raw extraction output before validation. Fields the user's text did not
/// mention may be absent or null.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSpec {
    pub task: Option<String>,
    pub frequency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub time: Option<String>,
}

/// Validate a raw extraction result into a [`ReminderSpec`], applying the
/// extraction defaults: time 09:00, start today, no expiry.
pub fn spec_from_raw(raw: RawSpec, today: NaiveDate) -> Result<ReminderSpec, ExtractError> {
    let task = raw
        .task
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ExtractError::Invalid("missing task".to_string()))?;

    let frequency = match raw.frequency {
        Some(f) => f
            .parse::<Frequency>()
            .map_err(ExtractError::Invalid)?,
        None => Frequency::Once,
    };

    let start_date = match raw.start_date {
        Some(s) => parse_date(&s)?,
        None => today,
    };

    let end_date = match raw.end_date {
        Some(s) => parse_date(&s)?,
        None => no_expiry(),
    };

    let time_of_day = match raw.time {
        Some(s) => parse_time(&s)?,
        None => default_time_of_day(),
    };

    let spec = ReminderSpec {
        task,
        frequency,
        start_date,
        end_date,
        time_of_day,
    };
    spec.validate()
        .map_err(|e| ExtractError::Invalid(e.to_string()))?;
    Ok(spec)
}

fn parse_date(s: &str) -> Result<NaiveDate, ExtractError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ExtractError::Invalid(format!("unparseable date: '{s}'")))
}

fn parse_time(s: &str) -> Result<NaiveTime, ExtractError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| ExtractError::Invalid(format!("unparseable time: '{s}'")))
}
