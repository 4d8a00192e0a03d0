//! # objdb Backend
//!
//! Document backend contract and reference implementations for objdb.
//!
//! Backends are **schema-less document stores**. They group JSON documents
//! into named collections and know nothing about entity types, validation
//! or wire tagging; `objdb_core` owns all of that.
//!
//! ## Design Principles
//!
//! - Documents are plain `serde_json` objects
//! - A backend assigns primary keys on insert
//! - Missing collections are reported as [`BackendError::CollectionNotFound`]
//!   so callers can decide whether to create them
//! - Must be `Send + Sync` so bulk operations can fan out across threads
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`JsonDirBackend`] - One JSON file per collection inside a directory
//!
//! ## Example
//!
//! ```rust
//! use objdb_backend::{DocumentBackend, FetchRequest, InMemoryBackend};
//! use serde_json::json;
//!
//! let backend = InMemoryBackend::new();
//! let doc = json!({"name": "Ada"}).as_object().cloned().unwrap();
//! let pkey = backend.insert("people", doc).unwrap();
//!
//! let found = backend.fetch("people", &FetchRequest::new()).unwrap();
//! assert_eq!(found[0]["pkey"], pkey.as_str());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{matches_filters, Document, DocumentBackend, FetchRequest, DEFAULT_KEY_FIELD};
pub use error::{BackendError, BackendResult};
pub use file::JsonDirBackend;
pub use memory::InMemoryBackend;
