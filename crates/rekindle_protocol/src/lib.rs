//! # Rekindle Protocol
//!
//! Wire types and JSON codec for the Rekindle API's cursor-paginated
//! endpoints.
//!
//! This crate provides:
//! - `Identified` / `Timestamped` for items held in paged collections
//! - `PageRequest` and `PageResult` for cursor pagination
//! - Domain payloads (`MemoryActivity`, `Memory`) passed through opaquely
//! - JSON decoding with page-shape validation
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod item;
mod page;
mod payload;

pub use error::{ProtocolError, ProtocolResult};
pub use item::{Identified, Timestamped};
pub use page::{PageRequest, PageResult, CURSOR_PARAM};
pub use payload::{
    ActivityType, ApiErrorBody, ImageRef, Memory, MemoryActivity, ReactionSummary,
};
