//! SQLite reminder repository implementation.
//!
//! Implements `ReminderRepository` from `remynd-core` using sqlx with split
//! read/write pools. Every mutation is a single statement on the serialized
//! writer connection; `mark_delivered` is a guarded UPDATE so the delivery
//! cursor only ever moves forward, no matter how often a tick retries.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::Row;

use remynd_core::repository::ReminderRepository;
use remynd_types::error::RepositoryError;
use remynd_types::reminder::{Frequency, Reminder, ReminderId, ReminderSpec};

use super::pool::DatabasePool;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// SQLite-backed implementation of `ReminderRepository`.
pub struct SqliteReminderRepository {
    pool: DatabasePool,
}

impl SqliteReminderRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Reminder.
struct ReminderRow {
    id: String,
    owner: String,
    task: String,
    frequency: String,
    start_date: String,
    end_date: String,
    time_of_day: String,
    last_delivered: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ReminderRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            task: row.try_get("task")?,
            frequency: row.try_get("frequency")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            time_of_day: row.try_get("time_of_day")?,
            last_delivered: row.try_get("last_delivered")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_reminder(self) -> Result<Reminder, RepositoryError> {
        let id = self
            .id
            .parse::<ReminderId>()
            .map_err(|e| RepositoryError::Query(format!("invalid reminder id: {e}")))?;

        let frequency: Frequency = self
            .frequency
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        let start_date = parse_date(&self.start_date)?;
        let end_date = parse_date(&self.end_date)?;
        let time_of_day = parse_time(&self.time_of_day)?;
        let last_delivered = self
            .last_delivered
            .as_deref()
            .map(parse_datetime)
            .transpose()?;
        let created_at = parse_datetime(&self.created_at)?;
        let updated_at = parse_datetime(&self.updated_at)?;

        Ok(Reminder {
            id,
            owner: self.owner,
            task: self.task,
            frequency,
            start_date,
            end_date,
            time_of_day,
            last_delivered,
            created_at,
            updated_at,
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| RepositoryError::Query(format!("invalid date: {e}")))
}

fn parse_time(s: &str) -> Result<NaiveTime, RepositoryError> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|e| RepositoryError::Query(format!("invalid time: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

fn format_time(t: &NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl ReminderRepository for SqliteReminderRepository {
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

        sqlx::query(
            "INSERT INTO reminders (id, owner, task, frequency, start_date, end_date, time_of_day, last_delivered, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(reminder.id.to_string())
        .bind(&reminder.owner)
        .bind(&reminder.task)
        .bind(reminder.frequency.to_string())
        .bind(format_date(&reminder.start_date))
        .bind(format_date(&reminder.end_date))
        .bind(format_time(&reminder.time_of_day))
        .bind(format_datetime(&reminder.created_at))
        .bind(format_datetime(&reminder.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(reminder)
    }

    async fn get(&self, id: &ReminderId) -> Result<Option<Reminder>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM reminders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let reminder_row = ReminderRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(reminder_row.into_reminder()?))
            }
            None => Ok(None),
        }
    }

    async fn find_by_owner(&self, owner: &str) -> Result<Vec<Reminder>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM reminders WHERE owner = ? ORDER BY id")
            .bind(owner)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        collect_reminders(&rows)
    }

    async fn find_by_owner_and_task(
        &self,
        owner: &str,
        fragment: &str,
    ) -> Result<Vec<Reminder>, RepositoryError> {
        // SQLite LIKE is case-insensitive for ASCII, matching the documented
        // substring semantics of delete/update.
        let rows = sqlx::query("SELECT * FROM reminders WHERE owner = ? AND task LIKE ? ORDER BY id")
            .bind(owner)
            .bind(format!("%{fragment}%"))
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        collect_reminders(&rows)
    }

    async fn find_due_candidates(&self, as_of: NaiveDate) -> Result<Vec<Reminder>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM reminders WHERE end_date >= ? ORDER BY id")
            .bind(format_date(&as_of))
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        collect_reminders(&rows)
    }

    async fn update(
        &self,
        id: &ReminderId,
        spec: &ReminderSpec,
    ) -> Result<Reminder, RepositoryError> {
        let result = sqlx::query(
            "UPDATE reminders SET task = ?, frequency = ?, start_date = ?, end_date = ?, time_of_day = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&spec.task)
        .bind(spec.frequency.to_string())
        .bind(format_date(&spec.start_date))
        .bind(format_date(&spec.end_date))
        .bind(format_time(&spec.time_of_day))
        .bind(format_datetime(&Utc::now()))
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: &ReminderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn mark_delivered(
        &self,
        id: &ReminderId,
        occurrence: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        // Occurrence instants are minute-aligned UTC, so their RFC 3339 form
        // is fixed-width and string comparison orders chronologically.
        let occurrence_str = format_datetime(&occurrence);
        let result = sqlx::query(
            "UPDATE reminders SET last_delivered = ?1, updated_at = ?2
             WHERE id = ?3 AND (last_delivered IS NULL OR last_delivered < ?1)",
        )
        .bind(&occurrence_str)
        .bind(format_datetime(&Utc::now()))
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Distinguish "already recorded" from "no such reminder"
        match self.get(id).await? {
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound),
        }
    }
}

fn collect_reminders(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Reminder>, RepositoryError> {
    let mut reminders = Vec::with_capacity(rows.len());
    for row in rows {
        let reminder_row =
            ReminderRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        reminders.push(reminder_row.into_reminder()?);
    }
    Ok(reminders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::DatabasePool;
    use chrono::TimeZone;
    use remynd_types::reminder::no_expiry;

    const OWNER: &str = "whatsapp:+15550001111";

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn make_spec(task: &str) -> ReminderSpec {
        ReminderSpec {
            task: task.to_string(),
            frequency: Frequency::Daily,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            end_date: no_expiry(),
            time_of_day: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_roundtrip() {
        let repo = SqliteReminderRepository::new(test_pool().await);
        let created = repo.create(&make_spec("call mom"), OWNER).await.unwrap();

        let found = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.owner, OWNER);
        assert_eq!(found.task, "call mom");
        assert_eq!(found.frequency, Frequency::Daily);
        assert_eq!(found.start_date, created.start_date);
        assert_eq!(found.end_date, no_expiry());
        assert_eq!(found.time_of_day, created.time_of_day);
        assert!(found.last_delivered.is_none());
    }

    #[tokio::test]
    async fn test_find_by_owner_isolates_owners() {
        let repo = SqliteReminderRepository::new(test_pool().await);
        repo.create(&make_spec("call mom"), OWNER).await.unwrap();
        repo.create(&make_spec("pay rent"), "whatsapp:+15559998888")
            .await
            .unwrap();

        let mine = repo.find_by_owner(OWNER).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].task, "call mom");
    }

    #[tokio::test]
    async fn test_find_by_owner_and_task_substring_case_insensitive() {
        let repo = SqliteReminderRepository::new(test_pool().await);
        repo.create(&make_spec("Call Mom"), OWNER).await.unwrap();
        repo.create(&make_spec("water plants"), OWNER).await.unwrap();

        let found = repo.find_by_owner_and_task(OWNER, "call mom").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].task, "Call Mom");

        let found = repo.find_by_owner_and_task(OWNER, "mom").await.unwrap();
        assert_eq!(found.len(), 1);

        let found = repo.find_by_owner_and_task(OWNER, "dad").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_due_candidates_excludes_expired() {
        let repo = SqliteReminderRepository::new(test_pool().await);
        let mut expired = make_spec("old");
        expired.end_date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        repo.create(&expired, OWNER).await.unwrap();
        repo.create(&make_spec("current"), OWNER).await.unwrap();

        let candidates = repo
            .find_due_candidates(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].task, "current");

        // On its last valid day the expiring reminder is still a candidate
        let candidates = repo
            .find_due_candidates(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_keeps_delivery_state() {
        let repo = SqliteReminderRepository::new(test_pool().await);
        let created = repo.create(&make_spec("call mom"), OWNER).await.unwrap();
        let delivered_at = Utc.with_ymd_and_hms(2024, 1, 2, 17, 0, 0).unwrap();
        repo.mark_delivered(&created.id, delivered_at).await.unwrap();

        let mut new_spec = make_spec("call mom after work");
        new_spec.frequency = Frequency::Weekly;
        new_spec.time_of_day = NaiveTime::from_hms_opt(18, 30, 0).unwrap();

        let updated = repo.update(&created.id, &new_spec).await.unwrap();
        assert_eq!(updated.task, "call mom after work");
        assert_eq!(updated.frequency, Frequency::Weekly);
        assert_eq!(updated.time_of_day, new_spec.time_of_day);
        assert_eq!(updated.owner, OWNER);
        assert_eq!(updated.last_delivered, Some(delivered_at));
    }

    #[tokio::test]
    async fn test_update_nonexistent() {
        let repo = SqliteReminderRepository::new(test_pool().await);
        let err = repo
            .update(&ReminderId::new(), &make_spec("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = SqliteReminderRepository::new(test_pool().await);
        let created = repo.create(&make_spec("call mom"), OWNER).await.unwrap();

        repo.delete(&created.id).await.unwrap();
        assert!(repo.get(&created.id).await.unwrap().is_none());

        let err = repo.delete(&created.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_mark_delivered_is_idempotent_and_monotonic() {
        let repo = SqliteReminderRepository::new(test_pool().await);
        let created = repo.create(&make_spec("call mom"), OWNER).await.unwrap();
        let first = Utc.with_ymd_and_hms(2024, 1, 2, 17, 0, 0).unwrap();

        assert!(repo.mark_delivered(&created.id, first).await.unwrap());
        // Same occurrence again: no double-advance
        assert!(!repo.mark_delivered(&created.id, first).await.unwrap());
        // An earlier occurrence never rolls the cursor back
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 17, 0, 0).unwrap();
        assert!(!repo.mark_delivered(&created.id, earlier).await.unwrap());

        let stored = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.last_delivered, Some(first));

        // A later occurrence advances
        let later = Utc.with_ymd_and_hms(2024, 1, 3, 17, 0, 0).unwrap();
        assert!(repo.mark_delivered(&created.id, later).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_delivered_missing_reminder() {
        let repo = SqliteReminderRepository::new(test_pool().await);
        let err = repo
            .mark_delivered(&ReminderId::new(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delivery_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("restart.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);

        let delivered_at = Utc.with_ymd_and_hms(2024, 1, 2, 17, 0, 0).unwrap();
        let id = {
            let repo = SqliteReminderRepository::new(DatabasePool::new(&url).await.unwrap());
            let created = repo.create(&make_spec("call mom"), OWNER).await.unwrap();
            repo.mark_delivered(&created.id, delivered_at).await.unwrap();
            created.id
        };

        // Fresh pool over the same file: the delivery cursor is still there
        let repo = SqliteReminderRepository::new(DatabasePool::new(&url).await.unwrap());
        let found = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(found.last_delivered, Some(delivered_at));
        assert!(!repo.mark_delivered(&id, delivered_at).await.unwrap());
    }
}
