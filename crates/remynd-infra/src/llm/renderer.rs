//! Friendly reminder message generation via LLM.
//!
//! `LlmRenderer` asks the chat backend for a one-sentence, human-sounding
//! version of the reminder. The scheduler treats any failure here as a
//! signal to use the deterministic template instead, so delivery never
//! depends on the backend being up.

use remynd_core::render::MessageRenderer;
use remynd_types::error::RenderError;
use remynd_types::reminder::Reminder;

use super::client::ChatClient;

const RENDER_SYSTEM_PROMPT: &str = "You write reminder notifications. Given the reminder details, \
generate a friendly and human-like reminder message in one sentence without any additional text \
or formatting.";

/// LLM-backed implementation of [`MessageRenderer`].
pub struct LlmRenderer {
    client: ChatClient,
}

impl LlmRenderer {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

impl MessageRenderer for LlmRenderer {
    #[tracing::instrument(name = "render_reminder", skip(self, reminder), fields(reminder_id = %reminder.id))]
    async fn render(&self, reminder: &Reminder) -> Result<String, RenderError> {
        let user_prompt = format!(
            "Task: {}, Time: {}, Date: {}.",
            reminder.task,
            reminder.time_of_day.format("%H:%M"),
            reminder.start_date.format("%Y-%m-%d"),
        );

        let message = self
            .client
            .complete(RENDER_SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(|e| RenderError::Backend(e.to_string()))?;

        let message = message.trim();
        if message.is_empty() {
            return Err(RenderError::Empty);
        }
        Ok(message.to_string())
    }
}
