//! Slack Block Kit and payload types.
//!
//! Outgoing types (blocks, views, messages) are serialize-only. Incoming
//! types (interaction payloads, slash commands) are deserialize-only and keep
//! rendered message blocks as raw JSON, since all the app ever does with them
//! is read text back out for reconstruction.
//!
//! See: <https://api.slack.com/block-kit>

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A message to post or to replace an existing message with.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutgoingMessage {
    /// Plain text fallback (notifications, screen readers).
    pub text: String,
    /// Message blocks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    /// Structured metadata attached to the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    /// Parent message when replying in a thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl OutgoingMessage {
    /// A message with fallback text and blocks.
    #[must_use]
    pub fn new(text: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            text: text.into(),
            blocks,
            metadata: None,
            thread_ts: None,
        }
    }

    /// A text-only message rendered as one markdown section.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        let blocks = vec![Block::section(Text::mrkdwn(text.clone()))];
        Self::new(text, blocks)
    }

    /// Attach structured metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Post as a reply in the given thread.
    #[must_use]
    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }
}

/// Structured metadata carried by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub event_type: String,
    #[serde(default)]
    pub event_payload: serde_json::Value,
}

/// Block Kit block types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Header block with large text.
    Header { text: PlainText },
    /// Section block with text and/or two-column fields.
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Text>,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
    /// Context block with small muted text.
    Context { elements: Vec<ContextElement> },
    /// Actions block with interactive elements.
    Actions {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<ActionElement>,
    },
    /// Form input (modals only).
    Input {
        block_id: String,
        label: PlainText,
        element: InputElement,
        optional: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<PlainText>,
    },
    /// Divider block (horizontal line).
    Divider,
}

impl Block {
    /// Section with a single text.
    #[must_use]
    pub const fn section(text: Text) -> Self {
        Self::Section {
            text: Some(text),
            fields: Vec::new(),
            accessory: None,
        }
    }

    /// Section made of two-column fields.
    #[must_use]
    pub const fn fields(fields: Vec<Text>) -> Self {
        Self::Section {
            text: None,
            fields,
            accessory: None,
        }
    }

    /// Header with plain text.
    #[must_use]
    pub fn header(text: impl Into<String>) -> Self {
        Self::Header {
            text: PlainText::new(text),
        }
    }

    /// Context line with one markdown element.
    #[must_use]
    pub fn context(text: impl Into<String>) -> Self {
        Self::Context {
            elements: vec![ContextElement::Mrkdwn { text: text.into() }],
        }
    }

    /// Actions block without a block id.
    #[must_use]
    pub const fn actions(elements: Vec<ActionElement>) -> Self {
        Self::Actions {
            block_id: None,
            elements,
        }
    }
}

/// Text object types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    /// Plain text (no formatting).
    PlainText { text: String, emoji: bool },
    /// Markdown text (supports formatting).
    Mrkdwn { text: String },
}

impl Text {
    /// Create a plain text object.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    /// Create a markdown text object.
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    /// The raw text content.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::PlainText { text, .. } | Self::Mrkdwn { text } => text,
        }
    }
}

/// Plain text object (headers, labels, button text).
#[derive(Debug, Clone, Serialize)]
pub struct PlainText {
    #[serde(rename = "type")]
    pub text_type: &'static str,
    pub text: String,
    pub emoji: bool,
}

impl PlainText {
    /// Create a new plain text object.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text",
            text: text.into(),
            emoji: true,
        }
    }
}

/// Context block elements.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    /// Markdown text in context.
    Mrkdwn { text: String },
    /// Plain text in context.
    PlainText { text: String, emoji: bool },
}

/// Accessory elements for section blocks.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    /// Button accessory.
    Button {
        text: PlainText,
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
    },
}

/// Option in a select, radio or checkbox group.
#[derive(Debug, Clone, Serialize)]
pub struct OptionObject {
    pub text: PlainText,
    pub value: String,
}

impl OptionObject {
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: PlainText {
                text_type: "plain_text",
                text: label.into(),
                emoji: false,
            },
            value: value.into(),
        }
    }

    /// Options from a `(code, label)` table.
    #[must_use]
    pub fn from_table(table: &[(&str, &str)]) -> Vec<Self> {
        table
            .iter()
            .map(|(code, label)| Self::new(*label, *code))
            .collect()
    }
}

/// Action block elements.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    /// Interactive button.
    Button {
        text: PlainText,
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
    },
    /// Checkbox group.
    Checkboxes {
        action_id: String,
        options: Vec<OptionObject>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        initial_options: Vec<OptionObject>,
    },
}

impl ActionElement {
    /// Button carrying a value.
    #[must_use]
    pub fn button(
        text: impl Into<String>,
        action_id: impl Into<String>,
        value: impl Into<String>,
        style: Option<ButtonStyle>,
    ) -> Self {
        Self::Button {
            text: PlainText::new(text),
            action_id: action_id.into(),
            value: Some(value.into()),
            style,
        }
    }
}

/// Modal input elements.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputElement {
    PlainTextInput {
        action_id: String,
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<PlainText>,
    },
    UrlTextInput {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<PlainText>,
    },
    StaticSelect {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<PlainText>,
        options: Vec<OptionObject>,
    },
    RadioButtons {
        action_id: String,
        options: Vec<OptionObject>,
    },
    MultiUsersSelect {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<PlainText>,
    },
}

/// Button style (affects color).
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    /// Green primary button.
    Primary,
    /// Red danger button.
    Danger,
}

/// A modal or App Home view.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    #[serde(rename = "type")]
    pub view_type: ViewType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_metadata: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<PlainText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<PlainText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<PlainText>,
    pub blocks: Vec<Block>,
}

impl View {
    /// A modal with a title and a close button.
    #[must_use]
    pub fn modal(title: impl Into<String>, close: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            view_type: ViewType::Modal,
            callback_id: None,
            private_metadata: None,
            title: Some(PlainText::new(title)),
            submit: None,
            close: Some(PlainText::new(close)),
            blocks,
        }
    }

    /// An App Home tab.
    #[must_use]
    pub const fn home(blocks: Vec<Block>) -> Self {
        Self {
            view_type: ViewType::Home,
            callback_id: None,
            private_metadata: None,
            title: None,
            submit: None,
            close: None,
            blocks,
        }
    }

    /// Make the modal submittable under the given callback id.
    #[must_use]
    pub fn with_submit(mut self, callback_id: &str, submit: impl Into<String>) -> Self {
        self.callback_id = Some(callback_id.to_owned());
        self.submit = Some(PlainText::new(submit));
        self
    }

    #[must_use]
    pub fn with_private_metadata(mut self, metadata: String) -> Self {
        self.private_metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    Modal,
    Home,
}

/// Context carried through a modal's `private_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMetadata {
    pub request_id: String,
    /// Channel of the message the modal was opened from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// The message the modal was opened from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_ts: Option<String>,
}

impl PrivateMetadata {
    /// Encode for a view.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode from a view. Bare strings are taken as the request id.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| Self {
            request_id: raw.to_owned(),
            ..Self::default()
        })
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Response from posting a message.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    /// Channel ID where message was posted.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp (unique ID).
    #[serde(default)]
    pub ts: Option<String>,
}

/// Response from creating a conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateConversationResponse {
    pub channel: ConversationInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// Incoming payloads
// =============================================================================

/// Slack interaction payload (the JSON in the `payload=` form field).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionPayload {
    /// Button clicks and checkbox toggles.
    BlockActions(BlockActionsPayload),
    /// Modal submissions.
    ViewSubmission(ViewSubmissionPayload),
    /// Anything else (shortcuts, view closed).
    #[serde(other)]
    Other,
}

/// Payload of a `block_actions` interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockActionsPayload {
    /// User who triggered the interaction.
    pub user: InteractionUser,
    /// Trigger ID for opening modals.
    #[serde(default)]
    pub trigger_id: Option<String>,
    /// Container information.
    #[serde(default)]
    pub container: Option<InteractionContainer>,
    /// Channel where interaction occurred.
    #[serde(default)]
    pub channel: Option<InteractionChannel>,
    /// The message the clicked element lives in.
    #[serde(default)]
    pub message: Option<InteractionMessage>,
    /// Actions that were triggered.
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
}

impl BlockActionsPayload {
    /// Channel of the message the action came from.
    #[must_use]
    pub fn channel_id(&self) -> Option<&str> {
        self.channel.as_ref().map(|c| c.id.as_str()).or_else(|| {
            self.container
                .as_ref()
                .and_then(|c| c.channel_id.as_deref())
        })
    }

    /// Timestamp of the message the action came from.
    #[must_use]
    pub fn message_ts(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.ts.as_str()).or_else(|| {
            self.container
                .as_ref()
                .and_then(|c| c.message_ts.as_deref())
        })
    }
}

/// User who triggered an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    /// Slack user ID.
    pub id: String,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Container for the interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionContainer {
    /// Container type (e.g., "message").
    #[serde(rename = "type")]
    pub container_type: String,
    /// Message timestamp.
    #[serde(default)]
    pub message_ts: Option<String>,
    /// Channel ID.
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Channel where interaction occurred.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionChannel {
    /// Channel ID.
    pub id: String,
    /// Channel name.
    #[serde(default)]
    pub name: Option<String>,
}

/// A rendered message as echoed back in an interaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionMessage {
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub blocks: Vec<serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

impl InteractionMessage {
    /// Fallback text plus every text string found in the blocks, one per line.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut parts = vec![self.text.clone()];
        for block in &self.blocks {
            collect_text(block, &mut parts);
        }
        parts.join("\n")
    }
}

fn collect_text(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                match child {
                    serde_json::Value::String(s) if key == "text" => out.push(s.clone()),
                    _ => collect_text(child, out),
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        _ => {}
    }
}

/// Action that was triggered.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionAction {
    /// Action ID (set when creating the element).
    pub action_id: String,
    /// Block ID containing this action.
    #[serde(default)]
    pub block_id: Option<String>,
    /// Value attached to a button.
    #[serde(default)]
    pub value: Option<String>,
    /// Current selection of a checkbox group.
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    /// Action type.
    #[serde(rename = "type")]
    pub action_type: String,
}

/// Payload of a `view_submission` interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewSubmissionPayload {
    pub user: InteractionUser,
    pub view: SubmittedView,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedView {
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub private_metadata: String,
    #[serde(default)]
    pub state: ViewState,
}

/// Submitted input values, keyed by block id then action id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: HashMap<String, HashMap<String, StateValue>>,
}

impl ViewState {
    fn get(&self, block_id: &str, action_id: &str) -> Option<&StateValue> {
        self.values.get(block_id)?.get(action_id)
    }

    /// Trimmed text input, `None` when blank.
    #[must_use]
    pub fn text(&self, block_id: &str, action_id: &str) -> Option<String> {
        let value = self.get(block_id, action_id)?.value.as_deref()?.trim();
        (!value.is_empty()).then(|| value.to_owned())
    }

    /// Selected option of a select or radio group.
    #[must_use]
    pub fn selected(&self, block_id: &str, action_id: &str) -> Option<&SelectedOption> {
        self.get(block_id, action_id)?.selected_option.as_ref()
    }

    /// Selected users of a multi-user select.
    #[must_use]
    pub fn users(&self, block_id: &str, action_id: &str) -> Vec<String> {
        self.get(block_id, action_id)
            .map(|v| v.selected_users.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateValue {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
    #[serde(default)]
    pub selected_users: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectedOption {
    pub value: String,
    #[serde(default)]
    pub text: Option<SelectedOptionText>,
}

impl SelectedOption {
    /// The option's label, if Slack sent it.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.text.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectedOptionText {
    pub text: String,
}

/// A slash command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    pub command: String,
    pub user_id: String,
    pub channel_id: String,
    pub trigger_id: String,
    pub text: String,
}

impl SlashCommand {
    /// Parse a form-encoded slash command body.
    ///
    /// # Errors
    ///
    /// Returns the name of the first missing required field.
    pub fn from_form(body: &str) -> Result<Self, String> {
        let fields: HashMap<String, String> = url::form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect();
        let required = |name: &str| {
            fields
                .get(name)
                .cloned()
                .ok_or_else(|| format!("missing field {name}"))
        };

        Ok(Self {
            command: required("command")?,
            user_id: required("user_id")?,
            channel_id: fields.get("channel_id").cloned().unwrap_or_default(),
            trigger_id: required("trigger_id")?,
            text: fields.get("text").cloned().unwrap_or_default(),
        })
    }
}

/// Events API envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    UrlVerification { challenge: String },
    EventCallback { event: Event },
    #[serde(other)]
    Other,
}

/// Events the app subscribes to.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    AppHomeOpened { user: String },
    #[serde(other)]
    Other,
}
