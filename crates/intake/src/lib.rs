//! SåPe intake library.
//!
//! A Slack app through which employees order penetration tests and threat
//! modeling sessions, and through which the security team approves, rejects
//! and follows them up. Requests are persisted in a Slack List.
//!
//! The crate is a library so the binary, the operator CLI and the integration
//! tests share one implementation.
//!
//! # Layers
//!
//! - [`slack`] - Web API client, Block Kit types, message and modal builders
//! - [`lists`] - Slack Lists gateway and the request list schema
//! - [`store`] - The request store over a list, with an in-process cache
//! - [`tracker`] - Optional card tracker for approved requests
//! - [`services`] - The request workflow and payload dispatch
//! - [`routes`] - Signed webhook endpoints

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod lists;
pub mod routes;
pub mod services;
pub mod slack;
pub mod state;
pub mod store;
pub mod tracker;
