//! Test support for SåPe intake.
//!
//! In-memory stand-ins for the two remote capabilities the workflow depends
//! on, plus a [`Harness`] wiring them into a store and the request actions.
//!
//! # Test Categories
//!
//! - `request_workflow` - Approve, reject and status flows end to end
//! - `request_store` - Save, read and rebuild against the fake list
//! - `webhooks` - Signed HTTP endpoints

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use sape_core::{ChannelId, ListId, RowId, UserId};
use sape_intake::lists::types::rich_text;
use sape_intake::lists::{
    AccessLevel, Cell, CellValue, ColumnSchema, CreatedList, ItemField, ListGateway, ListItem,
    ListPage, list_schema,
};
use sape_intake::services::{LookupPolicy, RequestActions};
use sape_intake::slack::{
    InteractionMessage, Messenger, OutgoingMessage, PostedMessage, SlackError, View,
};
use sape_intake::store::RequestStore;

/// Requester used across tests.
pub const REQUESTER: &str = "U0000000001";
/// Configured admin.
pub const ADMIN: &str = "U0000000002";
/// A user who is not an admin.
pub const OUTSIDER: &str = "U0000000003";
/// Admin notification channel.
pub const ADMIN_CHANNEL: &str = "C0000000001";
/// Id of the list created by [`InMemoryListGateway::with_request_list`].
pub const LIST_ID: &str = "L0000000001";
/// Bot user reported by the fake gateway.
pub const BOT_USER: &str = "U0BOTUSER1";

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("fake state lock poisoned")
}

fn fake_failure(method: &str) -> SlackError {
    SlackError::api(method, "internal_error", &serde_json::Value::Null)
}

// =============================================================================
// List gateway
// =============================================================================

#[derive(Debug, Default)]
struct MemoryList {
    schema: Vec<ColumnSchema>,
    rows: Vec<ListItem>,
}

impl MemoryList {
    fn field(&self, cell: &Cell) -> ItemField {
        let column = self
            .schema
            .iter()
            .find(|c| c.id.as_deref() == Some(cell.column_id.as_str()));
        let mut field = ItemField {
            key: column.map(|c| c.key.clone()),
            name: column.map(|c| c.name.clone()),
            column_id: Some(cell.column_id.to_string()),
            ..ItemField::default()
        };
        match &cell.value {
            CellValue::RichText(text) => field.rich_text = Some(rich_text(text)),
            CellValue::Select(codes) => field.select = Some(codes.clone()),
            CellValue::User(users) => field.user = Some(users.clone()),
        }
        field
    }
}

/// A list gateway holding lists in memory.
///
/// Created lists get column ids `Col01`, `Col02`, ... in schema order. Reads
/// always include the schema, like a list that carries metadata.
#[derive(Debug, Default)]
pub struct InMemoryListGateway {
    lists: Mutex<HashMap<String, MemoryList>>,
    shares: Mutex<Vec<(ListId, Vec<ChannelId>, AccessLevel)>>,
    next_list: AtomicU32,
    next_row: AtomicU32,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryListGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that already holds the request list under [`LIST_ID`].
    #[must_use]
    pub fn with_request_list() -> Self {
        let gateway = Self::new();
        locked(&gateway.lists).insert(
            LIST_ID.to_string(),
            MemoryList {
                schema: assign_column_ids(&list_schema()),
                rows: Vec::new(),
            },
        );
        gateway
    }

    /// Make every read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Rows of a list, in creation order.
    #[must_use]
    pub fn rows(&self, list_id: &str) -> Vec<ListItem> {
        locked(&self.lists)
            .get(list_id)
            .map(|list| list.rows.clone())
            .unwrap_or_default()
    }

    /// Number of lists created or seeded.
    #[must_use]
    pub fn list_count(&self) -> usize {
        locked(&self.lists).len()
    }

    /// Channels lists were shared with.
    #[must_use]
    pub fn shares(&self) -> Vec<(ListId, Vec<ChannelId>, AccessLevel)> {
        locked(&self.shares).clone()
    }

    fn check_write(&self, method: &str) -> Result<(), SlackError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(fake_failure(method));
        }
        Ok(())
    }
}

fn assign_column_ids(schema: &[ColumnSchema]) -> Vec<ColumnSchema> {
    schema
        .iter()
        .enumerate()
        .map(|(i, column)| ColumnSchema {
            id: Some(format!("Col{:02}", i + 1)),
            ..column.clone()
        })
        .collect()
}

#[async_trait]
impl ListGateway for InMemoryListGateway {
    async fn create_list(
        &self,
        _name: &str,
        _channel: &ChannelId,
        schema: &[ColumnSchema],
    ) -> Result<CreatedList, SlackError> {
        self.check_write("slackLists.create")?;
        let n = self.next_list.fetch_add(1, Ordering::SeqCst) + 2;
        let list_id =
            ListId::parse(format!("L{n:010}")).map_err(|_| fake_failure("slackLists.create"))?;
        let schema = assign_column_ids(schema);
        locked(&self.lists).insert(
            list_id.to_string(),
            MemoryList {
                schema: schema.clone(),
                rows: Vec::new(),
            },
        );
        Ok(CreatedList { list_id, schema })
    }

    async fn create_row(
        &self,
        list_id: &ListId,
        cells: &[Cell],
    ) -> Result<Option<RowId>, SlackError> {
        self.check_write("slackLists.items.create")?;
        let mut lists = locked(&self.lists);
        let list = lists
            .get_mut(list_id.as_str())
            .ok_or_else(|| fake_failure("slackLists.items.create"))?;
        let n = self.next_row.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("Rec{n:06}");
        let fields = cells.iter().map(|cell| list.field(cell)).collect();
        list.rows.push(ListItem {
            id: id.clone(),
            fields,
        });
        Ok(RowId::parse(id).ok())
    }

    async fn update_cells(
        &self,
        list_id: &ListId,
        row_id: &RowId,
        cells: &[Cell],
    ) -> Result<(), SlackError> {
        self.check_write("slackLists.items.update")?;
        let mut lists = locked(&self.lists);
        let list = lists
            .get_mut(list_id.as_str())
            .ok_or_else(|| fake_failure("slackLists.items.update"))?;
        let fields: Vec<ItemField> = cells.iter().map(|cell| list.field(cell)).collect();
        let row = list
            .rows
            .iter_mut()
            .find(|row| row.id == row_id.as_str())
            .ok_or_else(|| fake_failure("slackLists.items.update"))?;
        for field in fields {
            row.fields.retain(|f| f.column() != field.column());
            row.fields.push(field);
        }
        Ok(())
    }

    async fn list_rows(
        &self,
        list_id: &ListId,
        limit: Option<u32>,
    ) -> Result<ListPage, SlackError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(fake_failure("slackLists.items.list"));
        }
        let lists = locked(&self.lists);
        let list = lists.get(list_id.as_str()).ok_or_else(|| {
            SlackError::api(
                "slackLists.items.list",
                "list_not_found",
                &serde_json::Value::Null,
            )
        })?;
        let take = limit.map_or(usize::MAX, |n| n as usize);
        Ok(ListPage {
            items: list.rows.iter().take(take).cloned().collect(),
            schema: Some(list.schema.clone()),
        })
    }

    async fn set_access(
        &self,
        list_id: &ListId,
        channels: &[ChannelId],
        level: AccessLevel,
    ) -> Result<(), SlackError> {
        self.check_write("slackLists.access.set")?;
        locked(&self.shares).push((list_id.clone(), channels.to_vec(), level));
        Ok(())
    }

    async fn bot_user_id(&self) -> Result<String, SlackError> {
        Ok(BOT_USER.to_string())
    }
}

// =============================================================================
// Messenger
// =============================================================================

/// One recorded messaging call.
#[derive(Debug, Clone)]
pub enum Sent {
    Post {
        target: String,
        ts: String,
        message: OutgoingMessage,
    },
    Ephemeral {
        channel: String,
        user: String,
        message: OutgoingMessage,
    },
    Update {
        channel: String,
        ts: String,
        message: OutgoingMessage,
    },
    Delete {
        channel: String,
        ts: String,
    },
    OpenView {
        trigger_id: String,
        view: View,
    },
    PublishHome {
        user: String,
        view: View,
    },
    CreateChannel {
        name: String,
        is_private: bool,
        id: String,
    },
    Invite {
        channel: String,
        users: Vec<String>,
    },
    Topic {
        channel: String,
        topic: String,
    },
    Purpose {
        channel: String,
        purpose: String,
    },
}

/// A messenger that records every call and answers with fresh ids.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    next_ts: AtomicU32,
    next_channel: AtomicU32,
    fail_channel_creation: AtomicBool,
}

impl RecordingMessenger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_channel` fail.
    pub fn fail_channel_creation(&self, fail: bool) {
        self.fail_channel_creation.store(fail, Ordering::SeqCst);
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Sent> {
        locked(&self.sent).clone()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        locked(&self.sent).clear();
    }

    /// Messages posted to a channel or user, with their timestamps.
    #[must_use]
    pub fn posts_to(&self, target: &str) -> Vec<(String, OutgoingMessage)> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Post {
                    target: t,
                    ts,
                    message,
                } if t == target => Some((ts, message)),
                _ => None,
            })
            .collect()
    }

    /// Ephemeral messages shown to `user`.
    #[must_use]
    pub fn ephemerals_for(&self, user: &str) -> Vec<OutgoingMessage> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Ephemeral {
                    user: u, message, ..
                } if u == user => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Messages replaced in place.
    #[must_use]
    pub fn updates(&self) -> Vec<(String, String, OutgoingMessage)> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Update {
                    channel,
                    ts,
                    message,
                } => Some((channel, ts, message)),
                _ => None,
            })
            .collect()
    }

    /// Modals opened.
    #[must_use]
    pub fn opened_views(&self) -> Vec<View> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::OpenView { view, .. } => Some(view),
                _ => None,
            })
            .collect()
    }

    /// Channels created, as `(name, id)`.
    #[must_use]
    pub fn created_channels(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::CreateChannel { name, id, .. } => Some((name, id)),
                _ => None,
            })
            .collect()
    }

    /// Users invited to `channel`.
    #[must_use]
    pub fn invited_to(&self, channel: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Invite { channel: c, users } if c == channel => Some(users),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn record(&self, sent: Sent) {
        locked(&self.sent).push(sent);
    }

    fn ts(&self) -> String {
        let n = self.next_ts.fetch_add(1, Ordering::SeqCst) + 1;
        format!("1700000000.{n:06}")
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn post_message(
        &self,
        target: &str,
        message: OutgoingMessage,
    ) -> Result<PostedMessage, SlackError> {
        let ts = self.ts();
        self.record(Sent::Post {
            target: target.to_string(),
            ts: ts.clone(),
            message,
        });
        Ok(PostedMessage {
            channel: target.to_string(),
            ts,
        })
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        message: OutgoingMessage,
    ) -> Result<(), SlackError> {
        self.record(Sent::Ephemeral {
            channel: channel.to_string(),
            user: user.to_string(),
            message,
        });
        Ok(())
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        message: OutgoingMessage,
    ) -> Result<(), SlackError> {
        self.record(Sent::Update {
            channel: channel.to_string(),
            ts: ts.to_string(),
            message,
        });
        Ok(())
    }

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), SlackError> {
        self.record(Sent::Delete {
            channel: channel.to_string(),
            ts: ts.to_string(),
        });
        Ok(())
    }

    async fn open_view(&self, trigger_id: &str, view: View) -> Result<(), SlackError> {
        self.record(Sent::OpenView {
            trigger_id: trigger_id.to_string(),
            view,
        });
        Ok(())
    }

    async fn publish_home(&self, user: &str, view: View) -> Result<(), SlackError> {
        self.record(Sent::PublishHome {
            user: user.to_string(),
            view,
        });
        Ok(())
    }

    async fn create_channel(&self, name: &str, is_private: bool) -> Result<String, SlackError> {
        if self.fail_channel_creation.load(Ordering::SeqCst) {
            return Err(SlackError::api(
                "conversations.create",
                "name_taken",
                &serde_json::Value::Null,
            ));
        }
        let n = self.next_channel.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("C9{n:09}");
        self.record(Sent::CreateChannel {
            name: name.to_string(),
            is_private,
            id: id.clone(),
        });
        Ok(id)
    }

    async fn invite_to_channel(&self, channel: &str, users: &[String]) -> Result<(), SlackError> {
        self.record(Sent::Invite {
            channel: channel.to_string(),
            users: users.to_vec(),
        });
        Ok(())
    }

    async fn set_channel_topic(&self, channel: &str, topic: &str) -> Result<(), SlackError> {
        self.record(Sent::Topic {
            channel: channel.to_string(),
            topic: topic.to_string(),
        });
        Ok(())
    }

    async fn set_channel_purpose(&self, channel: &str, purpose: &str) -> Result<(), SlackError> {
        self.record(Sent::Purpose {
            channel: channel.to_string(),
            purpose: purpose.to_string(),
        });
        Ok(())
    }
}

/// Everything a message renders, for substring assertions.
#[must_use]
pub fn rendered(message: &OutgoingMessage) -> String {
    serde_json::to_string(message).unwrap_or_default()
}

/// The message as Slack would echo it back in an interaction.
#[must_use]
pub fn echoed(ts: &str, message: &OutgoingMessage) -> InteractionMessage {
    InteractionMessage {
        ts: ts.to_string(),
        text: message.text.clone(),
        blocks: message
            .blocks
            .iter()
            .filter_map(|block| serde_json::to_value(block).ok())
            .collect(),
        metadata: message.metadata.clone(),
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A store and request actions over the fakes, with one configured admin.
pub struct Harness {
    pub gateway: Arc<InMemoryListGateway>,
    pub messenger: Arc<RecordingMessenger>,
    pub store: Arc<RequestStore>,
    pub actions: Arc<RequestActions>,
}

impl Harness {
    /// A harness whose store uses the seeded request list.
    pub async fn with_list() -> Self {
        let harness = Self::build(
            Arc::new(InMemoryListGateway::with_request_list()),
            Some(LIST_ID),
        );
        harness
            .store
            .initialize()
            .await
            .expect("seeded list initializes");
        harness
    }

    /// A harness with no configured list; the store is cache-only.
    #[must_use]
    pub fn without_list() -> Self {
        Self::build(Arc::new(InMemoryListGateway::new()), None)
    }

    /// Another store and actions over the same list and messenger, with an
    /// empty cache, as after a restart.
    pub async fn restarted(&self) -> Self {
        let harness = Self::build_with(
            Arc::clone(&self.gateway),
            Arc::clone(&self.messenger),
            Some(LIST_ID),
        );
        harness
            .store
            .initialize()
            .await
            .expect("seeded list initializes");
        harness
    }

    fn build(gateway: Arc<InMemoryListGateway>, list_id: Option<&str>) -> Self {
        Self::build_with(gateway, Arc::new(RecordingMessenger::new()), list_id)
    }

    fn build_with(
        gateway: Arc<InMemoryListGateway>,
        messenger: Arc<RecordingMessenger>,
        list_id: Option<&str>,
    ) -> Self {
        let channel = ChannelId::parse(ADMIN_CHANNEL).expect("channel id");
        let store = Arc::new(RequestStore::new(
            Arc::clone(&gateway) as Arc<dyn ListGateway>,
            Arc::clone(&messenger) as Arc<dyn Messenger>,
            channel.clone(),
            list_id.map(|id| ListId::parse(id).expect("list id")),
        ));
        let actions = RequestActions::new(
            Arc::clone(&store),
            Arc::clone(&messenger) as Arc<dyn Messenger>,
            vec![UserId::parse(ADMIN).expect("admin id")],
            channel,
        )
        .with_lookup(LookupPolicy::immediate(1));
        Self {
            gateway,
            messenger,
            store,
            actions: Arc::new(actions),
        }
    }
}
