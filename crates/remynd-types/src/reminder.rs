use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::error::ReminderError;

/// Unique identifier for a reminder, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderId(pub Uuid);

impl ReminderId {
    /// Create a new ReminderId using UUID v7 (time-sortable, guaranteed ordering).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a ReminderId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ReminderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReminderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// How often a reminder fires within its `[start_date, end_date]` window.
///
/// `Once` implies a single occurrence at `start_date`; the periodic
/// frequencies stride from `start_date` (weekly = every 7 days, monthly and
/// yearly with end-of-month clamping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Once => write!(f, "once"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Yearly => write!(f, "yearly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "once" => Ok(Frequency::Once),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(format!("invalid frequency: '{other}'")),
        }
    }
}

/// Sentinel end date meaning "no expiry" (the reminder never lapses).
///
/// Stored as a real far-future date so date comparisons and the relational
/// schema stay uniform.
pub fn no_expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).expect("valid sentinel date")
}

/// Default wall-clock time for reminders that don't mention one.
pub fn default_time_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("valid default time")
}

/// A stored reminder.
///
/// `owner` is the channel-specific address of the requesting user
/// (e.g. `whatsapp:+15551234567`). `last_delivered` is the most recent
/// occurrence instant already notified; no occurrence at or before it is
/// ever sent again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub owner: String,
    pub task: String,
    pub frequency: Frequency,
    /// First day of the validity window (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the validity window (inclusive).
    pub end_date: NaiveDate,
    /// Wall-clock HH:MM at which occurrences fire (seconds always zero).
    pub time_of_day: NaiveTime,
    pub last_delivered: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    /// Whether this reminder uses the no-expiry sentinel end date.
    pub fn never_expires(&self) -> bool {
        self.end_date == no_expiry()
    }

    /// The mutable field set of this reminder, as a spec.
    ///
    /// Used by update commands, which replace all mutable fields at once.
    pub fn to_spec(&self) -> ReminderSpec {
        ReminderSpec {
            task: self.task.clone(),
            frequency: self.frequency,
            start_date: self.start_date,
            end_date: self.end_date,
            time_of_day: self.time_of_day,
        }
    }
}

/// The transient output of extraction: a reminder minus identity and
/// delivery state. Also the payload of a full-field update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderSpec {
    pub task: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub time_of_day: NaiveTime,
}

impl ReminderSpec {
    /// Validate the spec's internal invariants.
    pub fn validate(&self) -> Result<(), ReminderError> {
        if self.task.trim().is_empty() {
            return Err(ReminderError::EmptyTask);
        }
        if self.start_date > self.end_date {
            return Err(ReminderError::InvalidWindow {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reminder_id_display_fromstr_roundtrip() {
        let id = ReminderId::new();
        let parsed: ReminderId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_frequency_roundtrip() {
        for s in ["once", "daily", "weekly", "monthly", "yearly"] {
            let f: Frequency = s.parse().unwrap();
            assert_eq!(f.to_string(), s);
        }
    }

    #[test]
    fn test_frequency_case_insensitive() {
        assert_eq!("Daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert!("fortnightly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_frequency_serde_lowercase() {
        let json = serde_json::to_string(&Frequency::Weekly).unwrap();
        assert_eq!(json, "\"weekly\"");
    }

    #[test]
    fn test_spec_validate_ok() {
        let spec = ReminderSpec {
            task: "water the plants".to_string(),
            frequency: Frequency::Daily,
            start_date: date(2024, 1, 1),
            end_date: no_expiry(),
            time_of_day: default_time_of_day(),
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_spec_validate_rejects_inverted_window() {
        let spec = ReminderSpec {
            task: "x".to_string(),
            frequency: Frequency::Once,
            start_date: date(2024, 2, 1),
            end_date: date(2024, 1, 1),
            time_of_day: default_time_of_day(),
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_spec_validate_rejects_empty_task() {
        let spec = ReminderSpec {
            task: "   ".to_string(),
            frequency: Frequency::Once,
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 1),
            time_of_day: default_time_of_day(),
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_never_expires() {
        let now = Utc::now();
        let reminder = Reminder {
            id: ReminderId::new(),
            owner: "whatsapp:+15550001111".to_string(),
            task: "stretch".to_string(),
            frequency: Frequency::Daily,
            start_date: date(2024, 1, 1),
            end_date: no_expiry(),
            time_of_day: default_time_of_day(),
            last_delivered: None,
            created_at: now,
            updated_at: now,
        };
        assert!(reminder.never_expires());
        assert_eq!(reminder.to_spec().task, "stretch");
    }
}
