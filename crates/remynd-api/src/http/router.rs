//! Axum router configuration with middleware.
//!
//! Routes: `POST /webhook` for inbound messages, `GET /healthz` for
//! liveness. Middleware: CORS, tracing.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::webhook;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/webhook", post(webhook::receive_message))
        .route("/healthz", get(webhook::healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
