//! # objdb Testkit
//!
//! Test utilities for objdb.
//!
//! This crate provides:
//! - A sample schema ([`Library`]) and backend-backed stores ([`TestStore`])
//! - A fault-injecting backend ([`FaultyBackend`])
//! - Property-based test generators using proptest
//! - Tracing setup for test binaries
//!
//! ## Usage
//!
//! ```rust
//! use objdb_testkit::prelude::*;
//!
//! with_library(|library, store| {
//!     let books = store.manager(&library.book);
//!     books.create([("title", "Dune")], true).unwrap();
//!     assert_eq!(books.count().unwrap(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use logging::*;
