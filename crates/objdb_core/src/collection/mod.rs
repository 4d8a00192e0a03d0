//! Typed entity collections and their query DSL.
//!
//! [`EntityCollection`] is an ordered, type-homogeneous list with
//! Django-style lookups (`filter`, `exclude`, `get`), ordering, set algebra
//! and aggregation. Only [`EntityCollection::all`] touches a backend.

mod aggregate;
mod list;
mod lookup;
mod query;

pub use aggregate::{Aggregate, Reducer};
pub use list::EntityCollection;
pub use lookup::{lookups, Lookup, Operator, LOOKUP_SEPARATOR};
pub use query::FetchOptions;
