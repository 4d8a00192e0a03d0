//! Entity schemas: configurations, storage options and validators.

mod configuration;
mod storage;
pub mod validators;

pub use configuration::{ConfigKind, Configuration, DefaultFactory, DefaultValue, Validator};
pub use storage::StorageOptions;
