//! Notification message rendering.
//!
//! Rendering may delegate to a text-generation capability for a friendlier
//! tone, but delivery never depends on it: when the renderer fails, the
//! scheduler falls back to [`fallback_message`], a deterministic template.

use remynd_types::error::RenderError;
use remynd_types::reminder::Reminder;

/// Trait for turning a due reminder into the outbound message text.
pub trait MessageRenderer: Send + Sync {
    fn render(
        &self,
        reminder: &Reminder,
    ) -> impl std::future::Future<Output = Result<String, RenderError>> + Send;
}

/// Deterministic template used when the rendering capability is
/// unavailable or misbehaves.
pub fn fallback_message(reminder: &Reminder) -> String {
    format!(
        "Reminder: {} at {} on {}.",
        reminder.task,
        reminder.time_of_day.format("%H:%M"),
        reminder.start_date.format("%Y-%m-%d"),
    )
}

/// Renderer that always uses the deterministic template.
///
/// The default choice when no text-generation backend is configured.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer;

impl MessageRenderer for TemplateRenderer {
    async fn render(&self, reminder: &Reminder) -> Result<String, RenderError> {
        Ok(fallback_message(reminder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use remynd_types::reminder::{Frequency, ReminderId};

    fn sample() -> Reminder {
        let now = Utc::now();
        Reminder {
            id: ReminderId::new(),
            owner: "whatsapp:+15550001111".to_string(),
            task: "call mom".to_string(),
            frequency: Frequency::Once,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            time_of_day: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            last_delivered: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_fallback_message_is_deterministic() {
        let r = sample();
        assert_eq!(
            fallback_message(&r),
            "Reminder: call mom at 17:00 on 2024-01-02."
        );
        assert_eq!(fallback_message(&r), fallback_message(&r));
    }

    #[tokio::test]
    async fn test_template_renderer_uses_fallback() {
        let r = sample();
        let rendered = TemplateRenderer.render(&r).await.unwrap();
        assert_eq!(rendered, fallback_message(&r));
    }
}
