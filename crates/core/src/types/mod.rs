//! Core types for SåPe intake.
//!
//! Type-safe ids, the status vocabularies and the request model.

pub mod id;
pub mod request;
pub mod status;

pub use id::*;
pub use request::*;
pub use status::*;
