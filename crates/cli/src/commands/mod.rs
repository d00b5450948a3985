//! CLI command implementations.

use std::sync::Arc;

use sape_intake::config::{ConfigError, IntakeConfig};
use sape_intake::lists::SlackListGateway;
use sape_intake::slack::{SlackClient, SlackError};
use sape_intake::store::{RequestStore, StoreError};
use thiserror::Error;

pub mod list;
pub mod request;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Environment is incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Slack client could not be built.
    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Argument did not parse.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `REQUEST_LIST_ID` is not set.
    #[error("REQUEST_LIST_ID is not set. Run `sape-cli list create` first")]
    NoList,

    /// Output could not be rendered.
    #[error("Failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

/// Build a request store from the same environment the server reads.
pub fn open_store() -> Result<(IntakeConfig, RequestStore), CommandError> {
    let config = IntakeConfig::from_env()?;
    let slack = SlackClient::new(
        config.slack.bot_token.clone(),
        config.slack.signing_secret.clone(),
    )?;
    let store = RequestStore::new(
        Arc::new(SlackListGateway::new(slack.clone())),
        Arc::new(slack),
        config.admin_channel_id.clone(),
        config.request_list_id.clone(),
    );
    Ok((config, store))
}

/// Open the store and load the configured list's columns.
pub async fn open_configured_store() -> Result<RequestStore, CommandError> {
    let (config, store) = open_store()?;
    if config.request_list_id.is_none() {
        return Err(CommandError::NoList);
    }
    store.initialize().await?;
    Ok(store)
}
