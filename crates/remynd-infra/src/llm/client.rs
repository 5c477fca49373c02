//! Minimal OpenAI-compatible chat-completions client.
//!
//! Sends non-streaming requests to `{base_url}/v1/chat/completions` with
//! bearer authentication. The API key is wrapped in
//! [`secrecy::SecretString`] and is never logged or included in `Debug`
//! output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Errors from the chat-completions backend.
#[derive(Debug, thiserror::Error)]
pub enum LlmClientError {
    #[error("http error: {0}")]
    Http(String),

    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("empty completion response")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Chat-completions client for any OpenAI-compatible endpoint.
// Does NOT derive Debug so the API key can never leak through debug output.
pub struct ChatClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl ChatClient {
    /// Create a new client.
    ///
    /// * `api_key` - backend API key wrapped in SecretString
    /// * `base_url` - endpoint base, e.g. `https://api.openai.com`
    /// * `model` - model identifier sent with each request
    pub fn new(api_key: SecretString, base_url: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a system + user prompt pair at temperature 0 and return the
    /// completion text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, LlmClientError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
            max_tokens: 512,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmClientError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let message = message.chars().take(200).collect();
            return Err(LlmClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::Http(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmClientError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ChatClient::new(
            SecretString::from("key".to_string()),
            "https://api.openai.com/".to_string(),
            "gpt-4o-mini".to_string(),
        );
        assert_eq!(client.base_url, "https://api.openai.com");
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_chat_response_deserializes() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "{\"task\": \"call mom\"}"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            body.choices[0].message.content.as_deref(),
            Some("{\"task\": \"call mom\"}")
        );
    }
}
