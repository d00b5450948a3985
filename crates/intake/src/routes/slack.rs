//! Slack webhook handlers.
//!
//! Every handler verifies the request signature, parses the body and answers
//! Slack at once. The work itself runs on a spawned task so Slack's three
//! second acknowledgement window is never at risk.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use tracing::{debug, instrument};

use crate::error::AppError;
use crate::services::{dispatch_command, dispatch_event, dispatch_interaction};
use crate::slack::{EventEnvelope, InteractionPayload, SlashCommand};
use crate::state::AppState;

/// Create Slack webhook routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/slack/commands", post(handle_command))
        .route("/api/slack/interactions", post(handle_interaction))
        .route("/api/slack/events", post(handle_event))
}

/// Verify the `v0` signature Slack puts on every webhook.
fn verify(state: &AppState, headers: &HeaderMap, body: &str) -> Result<(), AppError> {
    let timestamp = headers
        .get("X-Slack-Request-Timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing timestamp header".into()))?;

    let signature = headers
        .get("X-Slack-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    state
        .slack()
        .verify_signature(timestamp, body, signature)
        .map_err(|e| AppError::Unauthorized(e.to_string()))
}

/// Handle a slash command.
#[instrument(skip(state, headers, body))]
async fn handle_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, AppError> {
    verify(&state, &headers, &body)?;

    let command = SlashCommand::from_form(&body).map_err(AppError::BadRequest)?;
    debug!(command = %command.command, "Slash command received");

    let actions = state.actions();
    tokio::spawn(async move { dispatch_command(&actions, command).await });

    Ok(StatusCode::OK)
}

/// Handle a button click, checkbox toggle or modal submission.
///
/// Always returns 200 once the payload parses; an empty body also closes a
/// submitted modal.
#[instrument(skip(state, headers, body))]
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, AppError> {
    verify(&state, &headers, &body)?;

    let raw = url::form_urlencoded::parse(body.as_bytes())
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| AppError::BadRequest("Invalid payload format".into()))?;

    let payload: InteractionPayload = serde_json::from_str(&raw)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse payload: {e}")))?;

    let actions = state.actions();
    tokio::spawn(async move { dispatch_interaction(&actions, payload).await });

    Ok(StatusCode::OK)
}

/// Handle an Events API callback, including the URL verification handshake.
#[instrument(skip(state, headers, body))]
async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, AppError> {
    verify(&state, &headers, &body)?;

    let envelope: EventEnvelope = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse event: {e}")))?;

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            Ok(Json(json!({ "challenge": challenge })).into_response())
        }
        EventEnvelope::EventCallback { event } => {
            let actions = state.actions();
            tokio::spawn(async move { dispatch_event(&actions, event).await });
            Ok(StatusCode::OK.into_response())
        }
        EventEnvelope::Other => Ok(StatusCode::OK.into_response()),
    }
}
