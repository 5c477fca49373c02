//! Reminder extraction via LLM.
//!
//! `LlmExtractor` asks the chat backend to pull task, frequency, start date,
//! end date, and time out of a free-form message, anchored to the current
//! date and time so relative expressions ("tomorrow", "in 2 years") resolve
//! deterministically. The response must be a JSON object; markdown code
//! fences around it are tolerated. Everything else -- backend failures,
//! unparseable output, invalid field values -- surfaces as an
//! [`ExtractError`], never a partial reminder.

use chrono::{DateTime, NaiveDate, Utc};

use remynd_core::extract::{spec_from_raw, Extractor, RawSpec};
use remynd_types::error::ExtractError;
use remynd_types::reminder::ReminderSpec;

use super::client::ChatClient;

/// System prompt for the extraction call.
///
/// Instructs the model to emit exactly the five reminder fields as JSON,
/// applying the documented defaults for anything the message leaves out.
const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract reminder details from a user's message.

Rules:
1. Extract the task, frequency, start date, end date, and time of day
2. frequency must be one of: "once", "daily", "weekly", "monthly", "yearly"
3. If no frequency is mentioned, use "once"
4. If no time is mentioned, use "09:00"
5. If no start date is mentioned, use today's date
6. If no end date is mentioned, use "9999-12-31"
7. Resolve relative dates ("today", "tomorrow", "in 2 years", "this year") against today's date
8. Dates are "YYYY-MM-DD", time is 24-hour "HH:MM"

Return ONLY a JSON object with exactly these keys: task, frequency, start_date, end_date, time.

Example output:
{
    "task": "meeting with team",
    "frequency": "daily",
    "start_date": "2023-10-15",
    "end_date": "2023-10-20",
    "time": "14:00"
}"#;

/// LLM-backed implementation of [`Extractor`].
pub struct LlmExtractor {
    client: ChatClient,
}

impl LlmExtractor {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

impl Extractor for LlmExtractor {
    #[tracing::instrument(name = "extract_reminder", skip(self, text), fields(model = self.client.model()))]
    async fn extract(&self, text: &str, now: DateTime<Utc>) -> Result<ReminderSpec, ExtractError> {
        let user_prompt = format!(
            "Today's date is {} and the current time is {}.\n\nMessage: {text}",
            now.format("%Y-%m-%d"),
            now.format("%H:%M"),
        );

        let content = self
            .client
            .complete(EXTRACTION_SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(|e| ExtractError::Backend(e.to_string()))?;

        parse_spec_response(&content, now.date_naive())
    }
}

/// Parse a raw completion into a validated [`ReminderSpec`].
pub(crate) fn parse_spec_response(
    content: &str,
    today: NaiveDate,
) -> Result<ReminderSpec, ExtractError> {
    let json = strip_code_fences(content);
    let raw: RawSpec = serde_json::from_str(json).map_err(|e| {
        tracing::warn!(
            error = %e,
            content_preview = &json[..json.len().min(200)],
            "extraction output was not valid JSON"
        );
        ExtractError::Malformed(e.to_string())
    })?;
    spec_from_raw(raw, today)
}

/// Strip a surrounding markdown code fence, if present.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
