//! Entity types, instances and the type registry.

mod instance;
mod registry;
mod signals;
mod types;

pub use instance::Entity;
pub use registry::Registry;
pub use signals::{Receiver, ReceiverId, Signal, SignalEvent, Signals};
pub use types::{CleanHook, EntityKind, EntityType, EntityTypeBuilder};
