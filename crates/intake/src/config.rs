//! Intake configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SLACK_BOT_TOKEN` - Slack bot token (xoxb-...)
//! - `SLACK_SIGNING_SECRET` - Slack app signing secret
//! - `ADMIN_CHANNEL_ID` - Channel receiving new request notifications
//!
//! ## Optional
//! - `ADMIN_USER_IDS` - Comma-separated Slack user IDs allowed to act on requests
//! - `REQUEST_LIST_ID` - Slack List backing the request store
//! - `INTAKE_HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)
//!
//! ## Optional (Trello - creates a card at approval when no ticket URL is given)
//! - `TRELLO_API_KEY` - Trello API key
//! - `TRELLO_API_TOKEN` - Trello API token
//! - `TRELLO_LIST_ID` - Board list new cards are added to

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use sape_core::validation::validate_user_ids;
use sape_core::{ChannelId, ListId, UserId, ValidationError};
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

impl ConfigError {
    fn invalid(var: &str, error: &ValidationError) -> Self {
        Self::InvalidEnvVar(var.to_string(), error.to_string())
    }
}

/// Intake application configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Slack credentials
    pub slack: SlackConfig,
    /// Channel receiving admin notifications
    pub admin_channel_id: ChannelId,
    /// Users allowed to approve, reject and update requests
    pub admin_user_ids: Vec<UserId>,
    /// Backing list, once one has been created
    pub request_list_id: Option<ListId>,
    /// Trello configuration (optional)
    pub trello: Option<TrelloConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Slack app credentials.
///
/// Implements `Debug` manually to redact secrets.
#[derive(Clone)]
pub struct SlackConfig {
    /// Slack bot token (xoxb-...).
    pub bot_token: SecretString,
    /// Slack app signing secret for webhook verification.
    pub signing_secret: SecretString,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .finish()
    }
}

impl SlackConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let bot_token = get_required_env("SLACK_BOT_TOKEN")?;
        let signing_secret = get_required_env("SLACK_SIGNING_SECRET")?;

        if let Err(e) = validate_secret_strength(&bot_token, "SLACK_BOT_TOKEN") {
            tracing::warn!("SLACK_BOT_TOKEN validation warning: {e}");
        }
        if let Err(e) = validate_secret_strength(&signing_secret, "SLACK_SIGNING_SECRET") {
            tracing::warn!("SLACK_SIGNING_SECRET validation warning: {e}");
        }

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            signing_secret: SecretString::from(signing_secret),
        })
    }
}

/// Trello API configuration for card creation at approval.
///
/// Implements `Debug` manually to redact the key and token.
#[derive(Clone)]
pub struct TrelloConfig {
    /// Trello API key
    pub api_key: SecretString,
    /// Trello API token
    pub api_token: SecretString,
    /// Board list ID new cards go to
    pub list_id: String,
}

impl std::fmt::Debug for TrelloConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_token", &"[REDACTED]")
            .field("list_id", &self.list_id)
            .finish()
    }
}

impl TrelloConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let api_key = get_optional_env("TRELLO_API_KEY");
        let api_token = get_optional_env("TRELLO_API_TOKEN");
        let list_id = get_optional_env("TRELLO_LIST_ID");

        match (api_key, api_token, list_id) {
            (Some(key), Some(token), Some(list_id)) => {
                if let Err(e) = validate_secret_strength(&token, "TRELLO_API_TOKEN") {
                    tracing::warn!("TRELLO_API_TOKEN validation warning: {e}");
                }
                Ok(Some(Self {
                    api_key: SecretString::from(key),
                    api_token: SecretString::from(token),
                    list_id,
                }))
            }
            (None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "TRELLO_*".to_string(),
                "TRELLO_API_KEY, TRELLO_API_TOKEN and TRELLO_LIST_ID must be set together"
                    .to_string(),
            )),
        }
    }
}

impl IntakeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or if an ID
    /// variable does not hold a valid Slack ID.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("INTAKE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("INTAKE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let slack = SlackConfig::from_env()?;
        let admin_channel_id = ChannelId::parse(get_required_env("ADMIN_CHANNEL_ID")?)
            .map_err(|e| ConfigError::invalid("ADMIN_CHANNEL_ID", &e))?;
        let admin_user_ids =
            parse_admin_ids(&get_optional_env("ADMIN_USER_IDS").unwrap_or_default())?;
        let request_list_id = get_optional_env("REQUEST_LIST_ID")
            .filter(|id| !id.trim().is_empty())
            .map(|id| {
                ListId::parse(id.trim()).map_err(|e| ConfigError::invalid("REQUEST_LIST_ID", &e))
            })
            .transpose()?;

        if admin_user_ids.is_empty() {
            tracing::warn!("ADMIN_USER_IDS is empty; nobody can approve requests");
        }

        let trello = TrelloConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            slack,
            admin_channel_id,
            admin_user_ids,
            request_list_id,
            trello,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns a reference to the Trello configuration (if configured).
    #[must_use]
    pub const fn trello(&self) -> Option<&TrelloConfig> {
        self.trello.as_ref()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a comma-separated list of admin user IDs. Blank entries are skipped.
fn parse_admin_ids(raw: &str) -> Result<Vec<UserId>, ConfigError> {
    let ids: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();

    validate_user_ids(&ids, "ADMIN_USER_IDS", true)
        .map_err(|e| ConfigError::invalid("ADMIN_USER_IDS", &e))?;

    ids.into_iter()
        .map(|id| UserId::parse(id).map_err(|e| ConfigError::invalid("ADMIN_USER_IDS", &e)))
        .collect()
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
