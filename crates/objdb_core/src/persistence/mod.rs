//! Persistence: the adapter, the wire mapping and collection naming.

mod adapter;
mod naming;
mod wire;

pub use adapter::PersistenceAdapter;
pub use naming::{collection_name, default_collection_name, partitioned, pluralize};
pub use wire::WireFormat;
