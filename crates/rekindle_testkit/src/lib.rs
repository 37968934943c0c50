//! # Rekindle Testkit
//!
//! Test utilities for the Rekindle client crates.
//!
//! This crate provides:
//! - Item and page fixtures
//! - Domain payload builders (`MemoryActivity`, `Memory`)
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rekindle_testkit::prelude::*;
//!
//! #[test]
//! fn merges_pages() {
//!     let first = page(&["a", "b"], Some("c2"), true);
//!     // ... feed it to a store
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
