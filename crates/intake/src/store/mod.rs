//! Request store backed by a Slack List.
//!
//! The list row is the durable record for the fields it has columns for
//! (project name, status, urgency, type, requester, assignees and the admin
//! message timestamp). Everything else lives in a process-local cache that
//! is back-filled on every read, so reads degrade toward the cache when the
//! list is unreachable. Status history is process-local only.
//!
//! The store is constructed once and shared as `Arc<RequestStore>`.

mod columns;
pub mod reconstruct;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sape_core::{
    ChannelId, Choice, ListId, ListStatus, MessageTs, Request, RequestId, RequestKind,
    RequestPatch, RequestStatus, RowId, StatusHistoryEntry, UserId, ValidationError,
    merge_status, validation::validate_request_data,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

pub use columns::ColumnMap;
pub use reconstruct::reconstruct;

use crate::lists::{
    ADMIN_MESSAGE_PLACEHOLDER, AccessLevel, Cell, ColumnAlias, LIST_NAME, ListGateway, ListItem,
    list_schema,
};
use crate::slack::{Messenger, SlackError, messages};

/// Number of rows read when loading the schema of an existing list.
const SCHEMA_PROBE_ROWS: u32 = 10;

/// Request store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing list is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A Slack call failed after retries.
    #[error(transparent)]
    Remote(#[from] SlackError),

    /// A business rule was violated while processing a request.
    #[error("{operation} failed for {request_id}: {message}")]
    RequestProcessing {
        request_id: String,
        operation: &'static str,
        message: String,
    },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Log a validation failure and carry on without the value.
pub fn safe_validate<T>(result: Result<T, ValidationError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(field = %e.field, value = %e.value, error = %e.message, "Validation failed");
            None
        }
    }
}

#[derive(Debug, Default)]
struct ListState {
    list_id: Option<ListId>,
    columns: ColumnMap,
}

/// The request store.
pub struct RequestStore {
    gateway: Arc<dyn ListGateway>,
    messenger: Arc<dyn Messenger>,
    notification_channel: ChannelId,
    list: RwLock<ListState>,
    cache: RwLock<HashMap<RequestId, RequestPatch>>,
    history: RwLock<HashMap<RequestId, Vec<StatusHistoryEntry>>>,
    prompted: AtomicBool,
}

impl std::fmt::Debug for RequestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestStore")
            .field("notification_channel", &self.notification_channel)
            .finish_non_exhaustive()
    }
}

impl RequestStore {
    /// Create a store. `list_id` is the configured list, if any.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ListGateway>,
        messenger: Arc<dyn Messenger>,
        notification_channel: ChannelId,
        list_id: Option<ListId>,
    ) -> Self {
        Self {
            gateway,
            messenger,
            notification_channel,
            list: RwLock::new(ListState {
                list_id,
                columns: ColumnMap::default(),
            }),
            cache: RwLock::new(HashMap::new()),
            history: RwLock::new(HashMap::new()),
            prompted: AtomicBool::new(false),
        }
    }

    /// Mark the store ready for use.
    pub async fn connect(&self) {
        let list_id = self.list_id().await;
        info!(list_id = ?list_id, "Request store ready");
    }

    /// The configured list, if any.
    pub async fn list_id(&self) -> Option<ListId> {
        self.list.read().await.list_id.clone()
    }

    /// The current column mapping.
    pub async fn columns(&self) -> ColumnMap {
        self.list.read().await.columns.clone()
    }

    /// Load the column mapping of the configured list.
    ///
    /// Without a configured list, posts the create-list prompt to the
    /// notification channel once and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configuration`] if a list is configured but no
    /// column ids can be recovered from it.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<Option<ListId>, StoreError> {
        let Some(list_id) = self.list_id().await else {
            warn!("No request list configured, waiting for it to be created");
            if !self.prompted.swap(true, Ordering::SeqCst) {
                let prompt = messages::build_create_list_prompt(LIST_NAME);
                if let Err(e) = self
                    .messenger
                    .post_message(self.notification_channel.as_str(), prompt)
                    .await
                {
                    warn!(error = %e, "Failed to post create-list prompt");
                }
            }
            return Ok(None);
        };

        info!(list_id = %list_id, "Loading request list schema");
        let columns = self.load_columns(&list_id).await?;
        if !columns.missing().is_empty() {
            warn!(missing = ?columns.missing(), "Request list is missing columns");
        }
        self.list.write().await.columns = columns;
        info!(list_id = %list_id, "Request list schema loaded");
        Ok(Some(list_id))
    }

    async fn load_columns(&self, list_id: &ListId) -> Result<ColumnMap, StoreError> {
        let page = match self.gateway.list_rows(list_id, Some(SCHEMA_PROBE_ROWS)).await {
            Ok(page) => page,
            Err(e) => {
                debug!(error = %e, "Reading rows failed while loading schema");
                return Err(StoreError::Configuration(format!(
                    "cannot read list {list_id}: {e}"
                )));
            }
        };

        if let Some(columns) = page.schema.as_deref().and_then(ColumnMap::from_schema) {
            info!(columns = columns.len(), "Column ids loaded from list metadata");
            return Ok(columns);
        }

        if let Some(columns) = page.items.first().and_then(ColumnMap::from_item) {
            warn!(columns = columns.len(), "Column ids inferred from an existing row");
            return Ok(columns);
        }

        Err(StoreError::Configuration(format!(
            "cannot load column ids from list {list_id}; ensure it has metadata or recreate it"
        )))
    }

    /// Provision the request list and make it the configured list.
    ///
    /// Adds a placeholder row and shares write access with the notification
    /// channel; both are best effort.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the list cannot be created.
    #[instrument(skip(self))]
    pub async fn create_list(&self) -> Result<ListId, StoreError> {
        info!(name = LIST_NAME, "Creating request list");
        let created = self
            .gateway
            .create_list(LIST_NAME, &self.notification_channel, &list_schema())
            .await?;

        let columns = ColumnMap::from_schema(&created.schema).unwrap_or_else(|| {
            warn!("Created list returned no usable schema");
            ColumnMap::default()
        });
        {
            let mut list = self.list.write().await;
            list.list_id = Some(created.list_id.clone());
            list.columns = columns.clone();
        }
        info!(list_id = %created.list_id, "Request list created");

        self.create_placeholder_row(&created.list_id, &columns).await;

        if let Err(e) = self
            .gateway
            .set_access(
                &created.list_id,
                std::slice::from_ref(&self.notification_channel),
                AccessLevel::Write,
            )
            .await
        {
            warn!(error = %e, "Unable to share request list with notification channel");
        }

        Ok(created.list_id)
    }

    async fn create_placeholder_row(&self, list_id: &ListId, columns: &ColumnMap) {
        let (Some(project), Some(request_id), Some(status)) = (
            columns.get(ColumnAlias::ProjectName),
            columns.get(ColumnAlias::RequestId),
            columns.get(ColumnAlias::Status),
        ) else {
            debug!("Skipping placeholder row, required columns missing");
            return;
        };

        let bot = match self.gateway.bot_user_id().await {
            Ok(bot) => Some(bot),
            Err(e) => {
                debug!(error = %e, "Could not resolve bot user for placeholder row");
                None
            }
        };

        let mut cells = vec![
            Cell::text(project.clone(), "📋 Eksempel - Slett denne raden"),
            Cell::text(request_id.clone(), "DEMO-000"),
            Cell::select(status.clone(), ListStatus::Pending.code()),
        ];
        if let Some(column) = columns.get(ColumnAlias::Urgency) {
            cells.push(Cell::select(column.clone(), "low"));
        }
        if let Some(column) = columns.get(ColumnAlias::RequestType) {
            cells.push(Cell::select(column.clone(), "other"));
        }
        if let Some(bot) = &bot {
            for alias in [ColumnAlias::RequestedBy, ColumnAlias::AssignedTo] {
                if let Some(column) = columns.get(alias) {
                    cells.push(Cell::users(column.clone(), vec![bot.clone()]));
                }
            }
        }
        if let Some(column) = columns.get(ColumnAlias::AdminMessageTs) {
            cells.push(Cell::text(column.clone(), ADMIN_MESSAGE_PLACEHOLDER));
        }

        match self.gateway.create_row(list_id, &cells).await {
            Ok(_) => info!("Placeholder row created; it can be deleted manually"),
            Err(e) => warn!(error = %e, "Could not create placeholder row"),
        }
    }

    async fn require_list(&self) -> Result<(ListId, ColumnMap), StoreError> {
        let list = self.list.read().await;
        list.list_id
            .clone()
            .map(|id| (id, list.columns.clone()))
            .ok_or_else(|| StoreError::Configuration("request list not initialized".to_string()))
    }

    /// Persist a request: update its row if one is known, create one otherwise.
    ///
    /// Returns the row id.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] if required fields are missing
    /// - [`StoreError::Configuration`] if no list is configured
    /// - [`StoreError::RequestProcessing`] if a created row has no id
    /// - [`StoreError::Remote`] if the list write fails
    #[instrument(skip(self, request), fields(request_id = %request.request_id))]
    pub async fn save_request(&self, request: &Request) -> Result<RowId, StoreError> {
        validate_request_data(
            &request.project_name,
            request.requested_by.as_str(),
            &request.team_members,
        )?;
        let (list_id, columns) = self.require_list().await?;

        let known_row = match &request.list_item_id {
            Some(row) => Some(row.clone()),
            None => self.cached_row_id(&request.request_id).await,
        };

        let patch = request.to_patch();
        let row_id = if let Some(row_id) = known_row {
            let cells = row_cells(&columns, &request.request_id, &patch, false);
            self.gateway.update_cells(&list_id, &row_id, &cells).await?;
            debug!(row_id = %row_id, "Updated request row");
            row_id
        } else {
            let cells = row_cells(&columns, &request.request_id, &patch, true);
            self.gateway
                .create_row(&list_id, &cells)
                .await?
                .ok_or_else(|| StoreError::RequestProcessing {
                    request_id: request.request_id.to_string(),
                    operation: "save_request",
                    message: "list row created but no item id returned".to_string(),
                })?
        };

        let mut patch = patch;
        patch.list_item_id = Some(row_id.clone());
        self.cache
            .write()
            .await
            .entry(request.request_id.clone())
            .or_default()
            .merge(patch);

        info!(row_id = %row_id, "Request saved");
        Ok(row_id)
    }

    async fn cached_row_id(&self, request_id: &RequestId) -> Option<RowId> {
        self.cache
            .read()
            .await
            .get(request_id)
            .and_then(|p| p.list_item_id.clone())
    }

    /// Read a request, merging its row with cached fields.
    ///
    /// A request with no row is `Ok(None)`. Without a configured list the
    /// cache is the only source.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the list cannot be read and nothing
    /// is cached for the request.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn get_request(&self, request_id: &RequestId) -> Result<Option<Request>, StoreError> {
        let Some(list_id) = self.list_id().await else {
            return Ok(self.cached_request(request_id).await);
        };

        let page = match self.gateway.list_rows(&list_id, None).await {
            Ok(page) => page,
            Err(e) => {
                if let Some(request) = self.cached_request(request_id).await {
                    warn!(error = %e, "List unreachable, serving cached request");
                    return Ok(Some(request));
                }
                return Err(e.into());
            }
        };

        let columns = self.columns().await;
        let Some(item) = page
            .items
            .iter()
            .find(|item| row_request_id(&columns, item).as_ref() == Some(request_id))
        else {
            debug!("No list row for request");
            return Ok(None);
        };

        Ok(self.merge_row(&columns, request_id, item).await)
    }

    async fn cached_request(&self, request_id: &RequestId) -> Option<Request> {
        let patch = self.cache.read().await.get(request_id).cloned()?;
        Request::from_patch(request_id.clone(), patch)
    }

    /// Merge a row into the cached record and back-fill the cache.
    async fn merge_row(
        &self,
        columns: &ColumnMap,
        request_id: &RequestId,
        item: &ListItem,
    ) -> Option<Request> {
        let mut cache = self.cache.write().await;
        let mut merged = cache.get(request_id).cloned().unwrap_or_default();
        let kind = merged
            .kind
            .or_else(|| request_id.kind())
            .unwrap_or(RequestKind::Pentest);

        let row = decode_row(columns, item, kind, merged.status);
        merged.merge(row);
        cache.insert(request_id.clone(), merged.clone());
        drop(cache);

        let request = Request::from_patch(request_id.clone(), merged);
        if request.is_none() {
            warn!(request_id = %request_id, "List row lacks project name or requester");
        }
        request
    }

    /// Apply a partial update.
    ///
    /// The cache always takes the update. Row-backed fields are written to
    /// the row, found via the cache, the patch or a scan of the list; with no
    /// row to write to, the remote write is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the list write fails.
    #[instrument(skip(self, patch), fields(request_id = %request_id))]
    pub async fn update_request(
        &self,
        request_id: &RequestId,
        patch: RequestPatch,
    ) -> Result<(), StoreError> {
        let cached_row = self.cached_row_id(request_id).await;
        self.cache
            .write()
            .await
            .entry(request_id.clone())
            .or_default()
            .merge(patch.clone());

        if !patch.touches_row() {
            return Ok(());
        }

        let Some(list_id) = self.list_id().await else {
            debug!("No request list configured, update kept in cache");
            return Ok(());
        };
        let columns = self.columns().await;

        let row_id = match cached_row.or_else(|| patch.list_item_id.clone()) {
            Some(row_id) => Some(row_id),
            None => {
                let found = self.find_row_id(&list_id, &columns, request_id).await?;
                if let Some(row_id) = &found {
                    if let Some(entry) = self.cache.write().await.get_mut(request_id) {
                        entry.list_item_id = Some(row_id.clone());
                    }
                }
                found
            }
        };
        let Some(row_id) = row_id else {
            warn!("No list row for request, skipping remote update");
            return Ok(());
        };

        let cells = row_cells(&columns, request_id, &patch, false);
        if cells.is_empty() {
            return Ok(());
        }
        self.gateway.update_cells(&list_id, &row_id, &cells).await?;
        debug!(row_id = %row_id, cells = cells.len(), "Request row updated");
        Ok(())
    }

    async fn find_row_id(
        &self,
        list_id: &ListId,
        columns: &ColumnMap,
        request_id: &RequestId,
    ) -> Result<Option<RowId>, StoreError> {
        let page = self.gateway.list_rows(list_id, None).await?;
        Ok(page
            .items
            .iter()
            .find(|item| row_request_id(columns, item).as_ref() == Some(request_id))
            .and_then(|item| RowId::parse(item.id.as_str()).ok()))
    }

    /// Record a status update. Newest entries come first.
    pub async fn add_status_history(&self, request_id: &RequestId, entry: StatusHistoryEntry) {
        self.history
            .write()
            .await
            .entry(request_id.clone())
            .or_default()
            .insert(0, entry);
    }

    /// Status updates of a request, newest first.
    pub async fn status_history(&self, request_id: &RequestId) -> Vec<StatusHistoryEntry> {
        self.history
            .read()
            .await
            .get(request_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every request whose row has the given status.
    ///
    /// Without a configured list the cache is filtered instead.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the list cannot be read.
    #[instrument(skip(self))]
    pub async fn requests_by_status(&self, status: ListStatus) -> Result<Vec<Request>, StoreError> {
        let Some(list_id) = self.list_id().await else {
            let cache = self.cache.read().await;
            let mut out: Vec<Request> = cache
                .iter()
                .filter_map(|(id, patch)| Request::from_patch(id.clone(), patch.clone()))
                .filter(|r| r.status.to_list() == status)
                .collect();
            out.sort_by(|a, b| a.request_id.cmp(&b.request_id));
            return Ok(out);
        };

        let columns = self.columns().await;
        let page = self.gateway.list_rows(&list_id, None).await?;
        let mut out = Vec::new();
        for item in &page.items {
            if row_status(&columns, item) != Some(status) {
                continue;
            }
            let Some(request_id) = row_request_id(&columns, item) else {
                continue;
            };
            if let Some(request) = self.merge_row(&columns, &request_id, item).await {
                out.push(request);
            }
        }
        Ok(out)
    }

    /// Check that the configured list is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if reading the list fails.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let Some(list_id) = self.list_id().await else {
            return Ok(());
        };
        self.gateway.list_rows(&list_id, Some(1)).await?;
        info!(list_id = %list_id, "Request store health check passed");
        Ok(())
    }

    /// Drop process-local state.
    pub async fn close(&self) {
        self.cache.write().await.clear();
        self.history.write().await.clear();
        info!("Request store closed");
    }
}

fn row_request_id(columns: &ColumnMap, item: &ListItem) -> Option<RequestId> {
    let column = columns.get(ColumnAlias::RequestId)?;
    let text = item.field(column)?.as_text()?;
    RequestId::parse(text.trim()).ok()
}

fn row_status(columns: &ColumnMap, item: &ListItem) -> Option<ListStatus> {
    let column = columns.get(ColumnAlias::Status)?;
    item.field(column)?.as_select()?.parse().ok()
}

/// Decode the row-backed fields of a row into a patch.
fn decode_row(
    columns: &ColumnMap,
    item: &ListItem,
    kind: RequestKind,
    cached_status: Option<RequestStatus>,
) -> RequestPatch {
    let field = |alias| columns.get(alias).and_then(|column| item.field(column));
    let users = |alias| {
        field(alias).map(|f| {
            f.as_users()
                .iter()
                .filter_map(|u| safe_validate(UserId::parse(u.as_str())))
                .collect::<Vec<_>>()
        })
    };

    RequestPatch {
        project_name: field(ColumnAlias::ProjectName).and_then(|f| f.as_text()),
        status: Some(merge_status(
            row_status(columns, item).unwrap_or_default(),
            cached_status,
        )),
        urgency: field(ColumnAlias::Urgency)
            .and_then(|f| f.as_select())
            .map(|code| Choice::urgency(kind, code)),
        request_type: field(ColumnAlias::RequestType)
            .and_then(|f| f.as_select())
            .map(|code| Choice::request_type(kind, code)),
        requested_by: users(ColumnAlias::RequestedBy).and_then(|u| u.into_iter().next()),
        assigned_to: users(ColumnAlias::AssignedTo),
        admin_message_ts: field(ColumnAlias::AdminMessageTs)
            .and_then(|f| f.as_text())
            .and_then(|ts| MessageTs::parse(ts.trim()).ok()),
        list_item_id: RowId::parse(item.id.as_str()).ok(),
        ..RequestPatch::default()
    }
}

/// Cells implied by the row-backed fields a patch sets.
///
/// New rows also get the request id and defaults for status, urgency and type.
fn row_cells(
    columns: &ColumnMap,
    request_id: &RequestId,
    patch: &RequestPatch,
    creating: bool,
) -> Vec<Cell> {
    let column = |alias| columns.get(alias).cloned();
    let code = |choice: Option<&Choice>, default: &str| match choice.filter(|c| !c.is_empty()) {
        Some(choice) => Some(choice.code.clone()),
        None => creating.then(|| default.to_string()),
    };
    let status = patch
        .status
        .or_else(|| creating.then_some(RequestStatus::Pending));
    let assigned = patch
        .assigned_to
        .as_ref()
        .filter(|users| !creating || !users.is_empty());

    let mut cells = Vec::new();
    if let (Some(c), Some(name)) = (column(ColumnAlias::ProjectName), &patch.project_name) {
        cells.push(Cell::text(c, name.clone()));
    }
    if let (Some(c), true) = (column(ColumnAlias::RequestId), creating) {
        cells.push(Cell::text(c, request_id.as_str()));
    }
    if let (Some(c), Some(status)) = (column(ColumnAlias::Status), status) {
        cells.push(Cell::select(c, status.to_list().code()));
    }
    if let (Some(c), Some(urgency)) = (
        column(ColumnAlias::Urgency),
        code(patch.urgency.as_ref(), "unknown"),
    ) {
        cells.push(Cell::select(c, urgency));
    }
    if let (Some(c), Some(request_type)) = (
        column(ColumnAlias::RequestType),
        code(patch.request_type.as_ref(), "other"),
    ) {
        cells.push(Cell::select(c, request_type));
    }
    if let (Some(c), Some(user)) = (column(ColumnAlias::RequestedBy), &patch.requested_by) {
        cells.push(Cell::users(c, vec![user.to_string()]));
    }
    if let (Some(c), Some(users)) = (column(ColumnAlias::AssignedTo), assigned) {
        cells.push(Cell::users(c, users.iter().map(ToString::to_string).collect()));
    }
    if let (Some(c), Some(ts)) = (column(ColumnAlias::AdminMessageTs), &patch.admin_message_ts) {
        cells.push(Cell::text(c, ts.as_str()));
    }

    cells
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::lists::CellValue;

    fn columns() -> ColumnMap {
        let schema: Vec<_> = list_schema()
            .into_iter()
            .map(|mut c| {
                c.id = Some(format!("Col_{}", c.key));
                c
            })
            .collect();
        ColumnMap::from_schema(&schema).expect("columns")
    }

    fn id() -> RequestId {
        RequestId::parse("PT-1000").expect("id")
    }

    fn keys(cells: &[Cell]) -> Vec<&str> {
        cells.iter().map(|c| c.column_id.as_str()).collect()
    }

    #[test]
    fn test_status_patch_writes_only_status_cell() {
        let cells = row_cells(
            &columns(),
            &id(),
            &RequestPatch::status(RequestStatus::Review),
            false,
        );
        assert_eq!(keys(&cells), ["Col_status"]);
        assert_eq!(cells[0].value, CellValue::Select(vec!["in_progress".to_string()]));
    }

    #[test]
    fn test_new_row_gets_id_and_defaults() {
        let patch = RequestPatch {
            project_name: Some("Foo".to_string()),
            requested_by: Some(UserId::parse("U0000000001").expect("user")),
            assigned_to: Some(Vec::new()),
            ..RequestPatch::default()
        };
        let cells = row_cells(&columns(), &id(), &patch, true);
        assert_eq!(
            keys(&cells),
            [
                "Col_project_name",
                "Col_request_id",
                "Col_status",
                "Col_urgency",
                "Col_request_type",
                "Col_requested_by"
            ]
        );
        assert_eq!(cells[3].value, CellValue::Select(vec!["unknown".to_string()]));
    }

    #[test]
    fn test_cache_only_patch_writes_nothing() {
        let patch = RequestPatch {
            ticket_url: Some("https://trello.com/c/abc".to_string()),
            ..RequestPatch::default()
        };
        assert!(row_cells(&columns(), &id(), &patch, false).is_empty());
    }

    #[test]
    fn test_decode_row_keeps_finer_cached_status() {
        let item: ListItem = serde_json::from_value(json!({
            "id": "Rec01",
            "fields": [
                {"column_id": "Col_project_name", "rich_text": crate::lists::types::rich_text("Foo")},
                {"column_id": "Col_status", "select": ["in_progress"]},
                {"column_id": "Col_urgency", "select": ["critical"]},
                {"column_id": "Col_requested_by", "user": ["U0000000001", "not a user"]},
                {"column_id": "Col_admin_message_ts", "rich_text": crate::lists::types::rich_text(ADMIN_MESSAGE_PLACEHOLDER)}
            ]
        }))
        .expect("parse");

        let patch = decode_row(
            &columns(),
            &item,
            RequestKind::Pentest,
            Some(RequestStatus::Review),
        );
        assert_eq!(patch.project_name.as_deref(), Some("Foo"));
        assert_eq!(patch.status, Some(RequestStatus::Review));
        assert_eq!(
            patch.urgency.map(|u| u.label),
            Some("Kritisk (innen 1 uke)".to_string())
        );
        assert_eq!(
            patch.requested_by.map(UserId::into_inner).as_deref(),
            Some("U0000000001")
        );
        assert_eq!(patch.admin_message_ts, None);
        assert_eq!(patch.list_item_id.map(RowId::into_inner).as_deref(), Some("Rec01"));

        let moved_on = decode_row(
            &columns(),
            &item,
            RequestKind::Pentest,
            Some(RequestStatus::Approved),
        );
        assert_eq!(moved_on.status, Some(RequestStatus::InProgress));
    }

    #[test]
    fn test_safe_validate() {
        assert_eq!(
            safe_validate(UserId::parse("U0000000001"))
                .map(UserId::into_inner)
                .as_deref(),
            Some("U0000000001")
        );
        assert!(safe_validate(UserId::parse("U1")).is_none());
    }
}
