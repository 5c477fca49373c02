//! Inbound message webhook handler.
//!
//! Receives Twilio's form-encoded webhook (`From` + `Body`), routes the
//! message through the command router (which sends the real reply via the
//! notifier), and acknowledges the webhook with an empty TwiML document --
//! the transport-level ack Twilio expects.

use axum::extract::{Form, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::http::error::AppError;
use crate::state::AppState;

const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

/// Twilio inbound message fields (subset).
#[derive(Debug, Deserialize)]
pub struct TwilioInbound {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
}

/// POST /webhook - receive an inbound message.
pub async fn receive_message(
    State(state): State<AppState>,
    Form(inbound): Form<TwilioInbound>,
) -> Result<Response, AppError> {
    let reply = state
        .router
        .handle_message(&inbound.from, &inbound.body)
        .await?;

    tracing::debug!(reply_len = reply.len(), "inbound message handled");

    Ok(([(CONTENT_TYPE, "text/xml")], EMPTY_TWIML).into_response())
}

/// GET /healthz - liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}
