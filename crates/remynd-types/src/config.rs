//! Configuration types for the Remynd service.
//!
//! `RemyndConfig` represents the top-level `config.toml` controlling the
//! scheduler cadence, the text-understanding backend, and the outbound
//! messaging channel. Secrets (API keys, auth tokens) are never stored
//! here -- they come from the environment at startup.

use serde::{Deserialize, Serialize};

/// Top-level configuration, loaded from `{data_dir}/config.toml`.
///
/// All fields have sensible defaults so a missing file yields a working
/// (if inert, without credentials) service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemyndConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub twilio: TwilioConfig,
}

/// Scheduler cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between scheduler ticks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Text-understanding backend settings (OpenAI-compatible chat completions).
///
/// The API key is read from the `REMYND_LLM_API_KEY` environment variable,
/// not from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the chat-completions endpoint.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier sent with each request.
    #[serde(default = "default_llm_model")]
    pub model: String,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
        }
    }
}

/// Outbound WhatsApp channel settings (Twilio Messages API).
///
/// The auth token is read from the `TWILIO_AUTH_TOKEN` environment
/// variable, not from this file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwilioConfig {
    /// Twilio account SID.
    #[serde(default)]
    pub account_sid: String,

    /// Sender address, e.g. `whatsapp:+14155238886`.
    #[serde(default)]
    pub from_number: String,
}
