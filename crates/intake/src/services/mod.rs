//! Business logic services for intake.
//!
//! # Services
//!
//! - `request_actions` - Request lifecycle transitions and their side effects
//! - `dispatch` - Routing of Slack commands, interactions and events

pub mod dispatch;
pub mod request_actions;

pub use dispatch::{
    PENTEST_COMMAND, THREAT_MODELING_COMMAND, button_click, dispatch_command, dispatch_event,
    dispatch_interaction,
};
pub use request_actions::{ActionOutcome, ButtonClick, LookupPolicy, RequestActions, Submission};
