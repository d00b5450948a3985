//! Row and schema operations on the backing Slack List.
//!
//! [`ListGateway`] holds no state of its own; the column mapping lives in
//! the request store. [`SlackListGateway`] is the production implementation.

use async_trait::async_trait;
use sape_core::{ChannelId, ListId, RowId};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::types::{AccessLevel, Cell, ColumnSchema, CreatedList, ListItem, ListPage, RowCell};
use crate::slack::{SlackClient, SlackError};

/// Page size used when walking every row of a list.
const PAGE_SIZE: u32 = 100;

/// Remote list operations.
#[async_trait]
pub trait ListGateway: Send + Sync {
    /// Provision a list with the given schema, shared into `channel`.
    async fn create_list(
        &self,
        name: &str,
        channel: &ChannelId,
        schema: &[ColumnSchema],
    ) -> Result<CreatedList, SlackError>;

    /// Create a row. Returns the new row id if Slack sent one back.
    async fn create_row(&self, list_id: &ListId, cells: &[Cell])
    -> Result<Option<RowId>, SlackError>;

    /// Write cells of an existing row. Each cell targets one column.
    async fn update_cells(
        &self,
        list_id: &ListId,
        row_id: &RowId,
        cells: &[Cell],
    ) -> Result<(), SlackError>;

    /// Read rows. `None` reads every row.
    async fn list_rows(&self, list_id: &ListId, limit: Option<u32>)
    -> Result<ListPage, SlackError>;

    async fn set_access(
        &self,
        list_id: &ListId,
        channels: &[ChannelId],
        level: AccessLevel,
    ) -> Result<(), SlackError>;

    /// The bot's own user id.
    async fn bot_user_id(&self) -> Result<String, SlackError>;
}

/// [`ListGateway`] over the Slack Web API.
#[derive(Debug, Clone)]
pub struct SlackListGateway {
    client: SlackClient,
}

impl SlackListGateway {
    #[must_use]
    pub const fn new(client: SlackClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct CreateListResponse {
    #[serde(default)]
    list_id: Option<String>,
    #[serde(default)]
    list_metadata: Option<ListMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ListMetadata {
    #[serde(default)]
    schema: Option<Vec<ColumnSchema>>,
}

#[derive(Debug, Deserialize)]
struct ItemsListResponse {
    #[serde(default)]
    items: Vec<ListItem>,
    #[serde(default)]
    list_metadata: Option<ListMetadata>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateItemResponse {
    #[serde(default)]
    item: Option<CreatedItem>,
}

#[derive(Debug, Deserialize)]
struct CreatedItem {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    user_id: String,
}

#[async_trait]
impl ListGateway for SlackListGateway {
    #[instrument(skip(self, schema), fields(columns = schema.len()))]
    async fn create_list(
        &self,
        name: &str,
        channel: &ChannelId,
        schema: &[ColumnSchema],
    ) -> Result<CreatedList, SlackError> {
        let response: CreateListResponse = self
            .client
            .call_as(
                "slackLists.create",
                json!({ "name": name, "channel_id": channel, "schema": schema }),
            )
            .await?;

        let list_id = response
            .list_id
            .and_then(|id| ListId::parse(id).ok())
            .ok_or_else(|| {
                SlackError::Response("slackLists.create: response missing list_id".to_string())
            })?;

        Ok(CreatedList {
            list_id,
            schema: response
                .list_metadata
                .and_then(|m| m.schema)
                .unwrap_or_default(),
        })
    }

    #[instrument(skip(self, cells), fields(list_id = %list_id, cells = cells.len()))]
    async fn create_row(
        &self,
        list_id: &ListId,
        cells: &[Cell],
    ) -> Result<Option<RowId>, SlackError> {
        let response: CreateItemResponse = self
            .client
            .call_as(
                "slackLists.items.create",
                json!({ "list_id": list_id, "initial_fields": cells }),
            )
            .await?;

        Ok(response
            .item
            .and_then(|item| item.id)
            .and_then(|id| RowId::parse(id).ok()))
    }

    #[instrument(skip(self, cells), fields(list_id = %list_id, row_id = %row_id))]
    async fn update_cells(
        &self,
        list_id: &ListId,
        row_id: &RowId,
        cells: &[Cell],
    ) -> Result<(), SlackError> {
        let cells: Vec<RowCell<'_>> = cells.iter().map(|cell| RowCell { row_id, cell }).collect();
        self.client
            .call(
                "slackLists.items.update",
                json!({ "list_id": list_id, "cells": cells }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(list_id = %list_id))]
    async fn list_rows(
        &self,
        list_id: &ListId,
        limit: Option<u32>,
    ) -> Result<ListPage, SlackError> {
        let mut page = ListPage::default();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = json!({
                "list_id": list_id,
                "limit": limit.unwrap_or(PAGE_SIZE),
            });
            if let (Some(cursor), Some(map)) = (&cursor, params.as_object_mut()) {
                map.insert("cursor".to_string(), Value::String(cursor.clone()));
            }

            let response: ItemsListResponse =
                self.client.call_as("slackLists.items.list", params).await?;

            if page.schema.is_none() {
                page.schema = response.list_metadata.and_then(|m| m.schema);
            }
            page.items.extend(response.items);

            cursor = response
                .response_metadata
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.is_empty());
            if limit.is_some() || cursor.is_none() {
                break;
            }
        }

        debug!(rows = page.items.len(), "Read list rows");
        Ok(page)
    }

    #[instrument(skip(self, channels), fields(list_id = %list_id))]
    async fn set_access(
        &self,
        list_id: &ListId,
        channels: &[ChannelId],
        level: AccessLevel,
    ) -> Result<(), SlackError> {
        self.client
            .call(
                "slackLists.access.set",
                json!({ "list_id": list_id, "channel_ids": channels, "access_level": level }),
            )
            .await?;
        Ok(())
    }

    async fn bot_user_id(&self) -> Result<String, SlackError> {
        let response: AuthTestResponse = self.client.call_as("auth.test", json!({})).await?;
        Ok(response.user_id)
    }
}
