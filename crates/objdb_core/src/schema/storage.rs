//! Per-type storage options of persistent entity types.

/// Where and how a persistent entity type is stored.
///
/// Storage options belong to exactly one type; subtypes do not inherit
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOptions {
    /// Collection name; defaults to the pluralized snake-cased type name.
    pub collection_name: Option<String>,

    /// Append `_for_YYYY_MM_DD` (UTC) to the collection name.
    pub daily_partition: bool,

    /// Create the collection and retry once when the backend reports it
    /// missing.
    pub auto_create_collection: bool,

    /// Name of the adapter backend to use instead of the default one.
    pub preferred_backend: Option<String>,

    /// Ensure the collection exists when the manager migrates.
    pub migrate: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            collection_name: None,
            daily_partition: false,
            auto_create_collection: false,
            preferred_backend: None,
            migrate: true,
        }
    }
}

impl StorageOptions {
    /// Creates options with every field at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the collection name.
    #[must_use]
    pub fn collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    /// Sets whether the collection changes daily.
    #[must_use]
    pub const fn daily_partition(mut self, value: bool) -> Self {
        self.daily_partition = value;
        self
    }

    /// Sets whether missing collections are created on demand.
    #[must_use]
    pub const fn auto_create_collection(mut self, value: bool) -> Self {
        self.auto_create_collection = value;
        self
    }

    /// Routes the type to a named backend.
    #[must_use]
    pub fn preferred_backend(mut self, name: impl Into<String>) -> Self {
        self.preferred_backend = Some(name.into());
        self
    }

    /// Sets whether migrations create the collection.
    #[must_use]
    pub const fn migrate(mut self, value: bool) -> Self {
        self.migrate = value;
        self
    }

    /// Returns `true` if nothing was customized.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
