//! The messaging capability the workflow depends on.
//!
//! [`SlackClient`](super::SlackClient) is the production implementation;
//! tests substitute a recording fake.

use async_trait::async_trait;

use super::error::SlackError;
use super::types::{OutgoingMessage, View};

/// Where a posted message landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

/// Messaging operations against the chat platform.
///
/// `target` is a channel id, or a user id for a direct message.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post a message.
    async fn post_message(
        &self,
        target: &str,
        message: OutgoingMessage,
    ) -> Result<PostedMessage, SlackError>;

    /// Post a message only `user` can see.
    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        message: OutgoingMessage,
    ) -> Result<(), SlackError>;

    /// Replace an existing message.
    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        message: OutgoingMessage,
    ) -> Result<(), SlackError>;

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), SlackError>;

    /// Open a modal for the interaction that produced `trigger_id`.
    async fn open_view(&self, trigger_id: &str, view: View) -> Result<(), SlackError>;

    /// Publish a user's App Home tab.
    async fn publish_home(&self, user: &str, view: View) -> Result<(), SlackError>;

    /// Create a channel and return its id.
    async fn create_channel(&self, name: &str, is_private: bool) -> Result<String, SlackError>;

    async fn invite_to_channel(&self, channel: &str, users: &[String]) -> Result<(), SlackError>;

    async fn set_channel_topic(&self, channel: &str, topic: &str) -> Result<(), SlackError>;

    async fn set_channel_purpose(&self, channel: &str, purpose: &str) -> Result<(), SlackError>;
}
