//! Slack integration for the intake workflow.
//!
//! This module provides:
//! - [`SlackClient`] for calling the Web API with retries
//! - The [`Messenger`] capability the workflow posts through
//! - Block Kit types for building messages and modals
//! - Message and modal builders
//! - Webhook signature verification
//!
//! # Flow
//!
//! 1. A user submits a request modal; an admin notification is posted
//! 2. An admin clicks Approve, Reject or Ask for info
//! 3. The webhook handler verifies the signature and acknowledges at once
//! 4. The action runs on a background task
//! 5. Messages are updated to reflect the new state

mod client;
mod error;
pub mod messages;
mod messenger;
pub mod modals;
mod retry;
mod types;

pub use client::{SlackClient, sign};
pub use error::{RETRYABLE_CODES, SlackError};
pub use messenger::{Messenger, PostedMessage};
pub use retry::RetryPolicy;
pub use types::{
    Accessory, ActionElement, Block, BlockActionsPayload, ButtonStyle, ContextElement, Event,
    EventEnvelope, InputElement, InteractionAction, InteractionMessage, InteractionPayload,
    InteractionUser, MessageMetadata, OptionObject, OutgoingMessage, PlainText, PrivateMetadata,
    SelectedOption, SlashCommand, SubmittedView, Text, View, ViewState, ViewSubmissionPayload,
    ViewType,
};
