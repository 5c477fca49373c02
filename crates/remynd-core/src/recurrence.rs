//! Pure recurrence logic: when does a reminder's next occurrence fall, and
//! is one due inside a polling window.
//!
//! No I/O. Matching is at minute granularity (seconds are ignored), and the
//! due-check takes a `[window_start, window_end]` window rather than a
//! single instant, so occurrences are never missed when a tick arrives late
//! or the clock drifts between polls.
//!
//! Stride semantics: `once` fires at `start_date` only; `daily` every day;
//! `weekly` every 7 days from `start_date`; `monthly`/`yearly` step whole
//! months/years from `start_date` with end-of-month clamping
//! (Jan 31 + 1 month = Feb 28/29, like `checked_add_months`).

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use remynd_types::reminder::{Frequency, Reminder};

/// Truncate an instant to minute granularity.
pub fn floor_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// The concrete instant of an occurrence on `date` at `time`.
fn occurrence_instant(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let time = time.with_second(0).unwrap_or(time);
    Utc.from_utc_datetime(&date.and_time(time))
}

/// Whole months from `a` to `b` (negative when `b` is earlier).
fn months_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (i64::from(b.year()) * 12 + i64::from(b.month0()))
        - (i64::from(a.year()) * 12 + i64::from(a.month0()))
}

/// First occurrence instant strictly after `after`, or None when the
/// recurrence rule is exhausted (no occurrence before `end_date` remains).
///
/// Ignores delivery state; see [`due_in_window`] for the delivered-aware
/// due check.
pub fn next_occurrence(reminder: &Reminder, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let after = floor_to_minute(after);
    let time = reminder.time_of_day;
    let first = occurrence_instant(reminder.start_date, time);

    match reminder.frequency {
        Frequency::Once => (first > after).then_some(first),

        Frequency::Daily => {
            let mut date = after.date_naive();
            if occurrence_instant(date, time) <= after {
                date = date.succ_opt()?;
            }
            if date < reminder.start_date {
                date = reminder.start_date;
            }
            (date <= reminder.end_date).then(|| occurrence_instant(date, time))
        }

        Frequency::Weekly => {
            let days = (after.date_naive() - reminder.start_date).num_days();
            let mut stride = if days < 0 { 0 } else { days / 7 };
            loop {
                let date = reminder
                    .start_date
                    .checked_add_signed(Duration::days(stride * 7))?;
                if date > reminder.end_date {
                    return None;
                }
                let instant = occurrence_instant(date, time);
                if instant > after {
                    return Some(instant);
                }
                stride += 1;
            }
        }

        Frequency::Monthly | Frequency::Yearly => {
            let step = match reminder.frequency {
                Frequency::Yearly => 12,
                _ => 1,
            };
            // Start one stride early: end-of-month clamping can shift a
            // candidate within its month, so the arithmetic estimate may
            // overshoot by one step.
            let mut k = months_between(reminder.start_date, after.date_naive()).max(0);
            k -= k % step;
            k = (k - step).max(0);
            loop {
                let date = reminder
                    .start_date
                    .checked_add_months(Months::new(u32::try_from(k).ok()?))?;
                if date > reminder.end_date {
                    return None;
                }
                let instant = occurrence_instant(date, time);
                if instant > after {
                    return Some(instant);
                }
                k += step;
            }
        }
    }
}

/// The occurrence instant due inside `[window_start, window_end]`, if any.
///
/// Returns the latest occurrence within the window (minute granularity,
/// both bounds inclusive) that is strictly greater than `last_delivered`.
/// When a slow poll leaves several occurrences of one reminder inside the
/// window, the older ones collapse into the latest.
pub fn due_in_window(
    reminder: &Reminder,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let ws = floor_to_minute(window_start);
    let we = floor_to_minute(window_end);
    if ws > we {
        return None;
    }

    // Scan from one minute before the window so an occurrence exactly at
    // the window start is included.
    let mut cursor = ws - Duration::minutes(1);
    let mut latest = None;
    while let Some(occurrence) = next_occurrence(reminder, cursor) {
        if occurrence > we {
            break;
        }
        latest = Some(occurrence);
        cursor = occurrence;
    }

    let due = latest?;
    if let Some(delivered) = reminder.last_delivered {
        if due <= floor_to_minute(delivered) {
            return None;
        }
    }
    Some(due)
}

/// Whether any occurrence is due inside the window.
pub fn is_due(
    reminder: &Reminder,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> bool {
    due_in_window(reminder, window_start, window_end).is_some()
}
