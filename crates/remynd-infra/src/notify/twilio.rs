//! Twilio WhatsApp notifier.
//!
//! Implements [`Notifier`] against the Twilio Messages API
//! (`POST /2010-04-01/Accounts/{sid}/Messages.json`, form-encoded, basic
//! auth). The auth token is wrapped in [`secrecy::SecretString`] and never
//! appears in logs or `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use remynd_core::notify::Notifier;
use remynd_types::error::NotifyError;

const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

/// Twilio-backed implementation of [`Notifier`].
// Does NOT derive Debug so the auth token can never leak through debug output.
pub struct TwilioNotifier {
    client: reqwest::Client,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    base_url: String,
}

impl TwilioNotifier {
    /// Create a new notifier.
    ///
    /// * `account_sid` - Twilio account SID
    /// * `auth_token` - Twilio auth token wrapped in SecretString
    /// * `from_number` - sender address, e.g. `whatsapp:+14155238886`
    pub fn new(account_sid: String, auth_token: SecretString, from_number: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            account_sid,
            auth_token,
            from_number,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

impl Notifier for TwilioNotifier {
    #[tracing::instrument(name = "twilio_send", skip(self, message), fields(owner = %owner))]
    async fn send(&self, owner: &str, message: &str) -> Result<(), NotifyError> {
        let params = [
            ("To", owner),
            ("From", self.from_number.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&params)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            return Err(NotifyError::Rejected(format!("status {status}: {body}")));
        }

        tracing::debug!("message accepted by channel");
        Ok(())
    }
}
