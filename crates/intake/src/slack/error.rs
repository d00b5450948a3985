//! Slack-related errors.

use thiserror::Error;

/// Error codes worth retrying: rate limiting and transient server trouble.
pub const RETRYABLE_CODES: &[&str] = &[
    "rate_limited",
    "ratelimited",
    "internal_error",
    "network_error",
    "timeout",
    "service_unavailable",
    "gateway_timeout",
    "server_error",
];

/// Errors that can occur when interacting with Slack.
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed before Slack answered.
    #[error("Slack request failed calling {method}: {message}")]
    Request { method: String, message: String },

    /// Failed to parse response.
    #[error("Slack response error: {0}")]
    Response(String),

    /// Slack API returned `ok: false`.
    #[error("Slack API error calling {method}: {code}")]
    Api {
        method: String,
        code: String,
        params: serde_json::Value,
    },

    /// Invalid webhook signature.
    #[error("Invalid Slack signature: {0}")]
    InvalidSignature(String),

    /// Failed to parse interaction payload.
    #[error("Invalid interaction payload: {0}")]
    InvalidPayload(String),

    /// Configuration error.
    #[error("Slack configuration error: {0}")]
    Config(String),
}

impl SlackError {
    /// Build an API error from a failed response.
    #[must_use]
    pub fn api(method: &str, code: impl Into<String>, params: &serde_json::Value) -> Self {
        Self::Api {
            method: method.to_owned(),
            code: code.into(),
            params: params.clone(),
        }
    }

    /// Remote error code used for retry classification.
    ///
    /// Transport failures classify as `network_error`.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Request { .. } => "network_error",
            Self::Response(_) => "invalid_response",
            Self::Api { code, .. } => code,
            Self::InvalidSignature(_) => "invalid_signature",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::Config(_) => "configuration_error",
        }
    }

    /// Remote method that failed, if this error came from a call.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request { method, .. } | Self::Api { method, .. } => Some(method),
            _ => None,
        }
    }

    /// Whether the retry policy should try again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        RETRYABLE_CODES.contains(&self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_and_code() {
        let err = SlackError::api(
            "slackLists.items.list",
            "list_not_found",
            &serde_json::json!({"list_id": "F1"}),
        );
        assert_eq!(
            err.to_string(),
            "Slack API error calling slackLists.items.list: list_not_found"
        );
        assert_eq!(err.code(), "list_not_found");
        assert_eq!(err.method(), Some("slackLists.items.list"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transport_failure_is_retryable_network_error() {
        let err = SlackError::Request {
            method: "chat.postMessage".to_string(),
            message: "connection reset".to_string(),
        };
        assert_eq!(err.code(), "network_error");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retryable_codes() {
        for code in RETRYABLE_CODES {
            let err = SlackError::api("chat.update", *code, &serde_json::Value::Null);
            assert!(err.is_retryable(), "{code}");
        }
        let err = SlackError::api("chat.update", "channel_not_found", &serde_json::Value::Null);
        assert!(!err.is_retryable());
        assert!(!SlackError::Config("missing token".to_string()).is_retryable());
    }
}
