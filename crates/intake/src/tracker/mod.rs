//! Card tracker for approved requests.
//!
//! When an admin approves a request without entering a ticket URL, a card is
//! created on the configured board and its short URL becomes the request's
//! ticket link.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.trello.com/1/cards`
//! - Authentication: `key` and `token` in the JSON body
//! - Response: the created card; only `shortUrl` is used

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::TrelloConfig;

/// Trello card endpoint.
const CARDS_URL: &str = "https://api.trello.com/1/cards";

/// Errors that can occur when creating a card.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Creates a card and returns a link to it.
#[async_trait]
pub trait CardTracker: Send + Sync {
    async fn create_card(&self, name: &str, description: &str) -> Result<String, TrackerError>;
}

/// Trello API client.
#[derive(Clone)]
pub struct TrelloClient {
    inner: Arc<TrelloClientInner>,
}

struct TrelloClientInner {
    client: reqwest::Client,
    config: TrelloConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCard<'a> {
    key: &'a str,
    token: &'a str,
    id_list: &'a str,
    name: &'a str,
    desc: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedCard {
    short_url: String,
}

impl TrelloClient {
    /// Create a new Trello API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: TrelloConfig) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(TrelloClientInner { client, config }),
        })
    }

    /// The board list new cards are added to.
    #[must_use]
    pub fn list_id(&self) -> &str {
        &self.inner.config.list_id
    }
}

#[async_trait]
impl CardTracker for TrelloClient {
    #[instrument(skip(self, description), fields(list_id = %self.inner.config.list_id))]
    async fn create_card(&self, name: &str, description: &str) -> Result<String, TrackerError> {
        let config = &self.inner.config;
        let body = CreateCard {
            key: config.api_key.expose_secret(),
            token: config.api_token.expose_secret(),
            id_list: &config.list_id,
            name,
            desc: description,
        };

        let response = self.inner.client.post(CARDS_URL).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TrackerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let card: CreatedCard = response
            .json()
            .await
            .map_err(|e| TrackerError::Parse(format!("Failed to parse card: {e}")))?;

        info!(url = %card.short_url, "Created tracker card");
        Ok(card.short_url)
    }
}

impl std::fmt::Debug for TrelloClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloClient")
            .field("list_id", &self.inner.config.list_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_card_body_shape() {
        let body = CreateCard {
            key: "k",
            token: "t",
            id_list: "abc",
            name: "Pentest: Foo",
            desc: "PT-1",
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(value["idList"], "abc");
        assert_eq!(value["desc"], "PT-1");
        assert_eq!(value["key"], "k");
    }

    #[test]
    fn test_created_card_reads_short_url() {
        let card: CreatedCard = serde_json::from_str(
            r#"{"id":"1","shortUrl":"https://trello.com/c/abc","url":"https://trello.com/c/abc/1-foo"}"#,
        )
        .expect("parse");
        assert_eq!(card.short_url, "https://trello.com/c/abc");
    }
}
