//! # Rekindle Sync
//!
//! Cursor-paginated collection synchronizer for the Rekindle client.
//!
//! This crate provides:
//! - Remote page fetching over an abstract HTTP client
//! - A collection store merging pages by id, per parent key
//! - A sync controller guarding against overlapping fetches
//! - A consumer binding with explicit mount/unmount lifecycle
//!
//! ## Architecture
//!
//! ```text
//! FeedBinding ──► SyncController ──► PageFetcher (HTTP) ──► REST API
//!                      │
//!                      └──► CollectionStore (reset / append / clear)
//! ```
//!
//! ## Key Invariants
//!
//! - Items are kept in server order and never re-sorted
//! - No collection holds two items with the same id
//! - At most one fetch per parent key is in flight; extra calls are dropped
//! - A failed fetch changes only the collection's error
//! - Responses for cleared collections are discarded

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod binding;
mod config;
mod controller;
mod error;
mod http;
mod store;
mod transport;

pub use binding::{FeedBinding, FeedView};
pub use config::{
    SyncConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, ENV_API_TOKEN, ENV_API_URL, ENV_PAGE_SIZE,
};
pub use controller::{SyncController, SyncStats};
pub use error::{ErrorKind, SyncError, SyncResult};
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
pub use http::{
    build_endpoint, ActivityFetcher, GroupMemoryFetcher, HttpClient, HttpPageFetcher,
    HttpResponse, PagedResource, MEMORIES_PREFIX, USER_GROUPS_PREFIX,
};
pub use store::{
    CollectionState, CollectionStore, FetchKind, FetchPhase, FetchTicket, LoadOutcome, SkipReason,
};
pub use transport::{check_page_size, FetchCall, MockFetcher, PageFetcher};

pub use rekindle_protocol::{Identified, PageRequest, PageResult};
