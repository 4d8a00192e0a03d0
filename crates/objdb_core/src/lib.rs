//! # objdb Core
//!
//! Entity modeling and query engine for objdb.
//!
//! This crate provides:
//! - Declarative schemas ([`Configuration`]) bound once to an entity type
//! - A type [`Registry`] resolving locators, including nested wire tags
//! - Runtime-checked [`Entity`] instances with lifecycle [`Signals`]
//! - [`EntityCollection`], a typed list with Django-style lookups,
//!   ordering, set algebra and aggregation
//! - [`EntityManager`], the per-type entry point for queries and writes
//! - [`PersistenceAdapter`], the wire mapping and backend lifecycle
//! - [`EntityCache`], the bounded register of in-memory types
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use objdb_backend::InMemoryBackend;
//! use objdb_core::{
//!     Configuration, EntityManager, EntityType, PersistenceAdapter, Registry, Value, ValueType,
//! };
//!
//! let registry = Arc::new(Registry::new());
//! let person = registry
//!     .register(
//!         EntityType::persistent("Person").config(
//!             Configuration::persistent()
//!                 .with_attribute("name", [ValueType::Text])
//!                 .with_attribute("age", [ValueType::Int])
//!                 .with_required(["name"]),
//!         ),
//!     )
//!     .unwrap();
//!
//! let adapter = Arc::new(PersistenceAdapter::new(registry, Arc::new(InMemoryBackend::new())));
//! let people = EntityManager::new(person, adapter);
//! for (name, age) in [("Ada", 30), ("Bo", 20), ("Cy", 25)] {
//!     people.create([("name", Value::from(name)), ("age", Value::from(age))], true).unwrap();
//! }
//!
//! let adults = people.filter([("age__gte", 25)]).unwrap().order_by(["-age"]).unwrap();
//! assert_eq!(adults.values_list(&["name"]).unwrap(), [[Value::from("Ada")], [Value::from("Cy")]]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod collection;
mod config;
mod entity;
mod error;
mod fanout;
mod manager;
mod persistence;
mod schema;
mod value;

pub use cache::{CachePolicy, CacheRecord, EntityCache};
pub use collection::{
    lookups, Aggregate, EntityCollection, FetchOptions, Lookup, Operator, Reducer,
    LOOKUP_SEPARATOR,
};
pub use config::{AdapterConfig, DEFAULT_TYPE_FIELD};
pub use entity::{
    CleanHook, Entity, EntityKind, EntityType, EntityTypeBuilder, Receiver, ReceiverId,
    Registry, Signal, SignalEvent, Signals,
};
pub use error::{CacheError, CoreError, CoreResult, DatabaseError, SchemaError};
pub use manager::EntityManager;
pub use persistence::{
    collection_name, default_collection_name, partitioned, pluralize, PersistenceAdapter,
    WireFormat,
};
pub use schema::{
    validators, ConfigKind, Configuration, DefaultFactory, DefaultValue, StorageOptions,
    Validator,
};
pub use value::{Value, ValueType};
