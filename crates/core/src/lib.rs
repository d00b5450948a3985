//! SåPe Core - shared types for the pentest and threat-modeling intake.
//!
//! This crate provides the types used across all SåPe components:
//! - `intake` - Slack app that receives, approves and tracks requests
//! - `cli` - Operator tooling for the backing Slack List
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. The request model, the status vocabularies and the projection
//! between them live here so every component agrees on them.
//!
//! # Modules
//!
//! - [`types`] - Validated ids, statuses and the request model
//! - [`validation`] - Identifier grammars and request payload checks

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::ValidationError;
