//! HTTP route handlers for intake.
//!
//! # Route Structure
//!
//! ```text
//! GET  /internal/is_alive       - Liveness check
//! GET  /health                  - Liveness check (alias)
//! GET  /health/ready            - Readiness check (request list reachable)
//!
//! # Slack webhooks (signed)
//! POST /api/slack/commands      - Slash commands
//! POST /api/slack/interactions  - Button clicks and modal submissions
//! POST /api/slack/events        - Events API (URL verification, App Home)
//! ```

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

pub mod slack;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/internal/is_alive", get(is_alive))
        .route("/health", get(is_alive))
        .route("/health/ready", get(readiness))
        .merge(slack::router())
}

/// Liveness check endpoint.
///
/// Returns "OK" if the server is running. Does not check dependencies.
async fn is_alive() -> &'static str {
    "OK"
}

/// Readiness check endpoint.
///
/// Returns 503 Service Unavailable if the request list cannot be read.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
