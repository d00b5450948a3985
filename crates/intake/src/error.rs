//! Unified error handling for the intake app.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sape_core::ValidationError;
use thiserror::Error;

use crate::slack::SlackError;
use crate::store::StoreError;
use crate::tracker::TrackerError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Slack API operation failed.
    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    /// Card tracker operation failed.
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request signature missing or wrong.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Text suitable for showing the acting Slack user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => format!("⚠️ Ugyldig verdi for {}: {}", e.field, e.message),
            Self::NotFound(id) => format!("⚠️ Fant ikke forespørsel {id}."),
            Self::Store(StoreError::Configuration(_)) => {
                "⚠️ Forespørselslisten er ikke satt opp ennå. Kontakt en administrator.".to_string()
            }
            _ => "❌ Beklager, det oppstod en feil. Prøv igjen senere eller kontakt teamet direkte."
                .to_string(),
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Slack(_) | Self::Tracker(_) | Self::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Intake request error"
            );
        }

        let status = match &self {
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Slack(_) | Self::Tracker(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Slack(_) | Self::Tracker(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Record the acting Slack user on the Sentry scope.
pub fn set_sentry_user(slack_user_id: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(slack_user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("PT-1000".to_string());
        assert_eq!(err.to_string(), "Not found: PT-1000");

        let err = AppError::BadRequest("invalid payload".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid payload");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Slack(SlackError::Response("bad".to_string()))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::Internal("row 42 exploded".to_string());
        assert!(!err.user_message().contains("row 42"));

        let err = AppError::Store(StoreError::Configuration("no list".to_string()));
        assert!(err.user_message().contains("ikke satt opp"));
    }
}
