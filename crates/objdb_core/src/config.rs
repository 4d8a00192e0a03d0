//! Persistence adapter configuration.

use objdb_backend::DEFAULT_KEY_FIELD;

/// Field carrying the type locator of nested entities in wire documents.
pub const DEFAULT_TYPE_FIELD: &str = "__type__";

/// Configuration of a [`PersistenceAdapter`](crate::PersistenceAdapter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Document field holding the primary key.
    pub primary_key_field: String,

    /// Document field holding the type locator of nested entities.
    pub type_field: String,

    /// Limit applied to fetches that do not set one (`None` = unbounded).
    pub default_limit: Option<usize>,

    /// Send fetch filters to the backend; when off they are applied after
    /// the fetch.
    pub forward_filters: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            primary_key_field: DEFAULT_KEY_FIELD.to_string(),
            type_field: DEFAULT_TYPE_FIELD.to_string(),
            default_limit: None,
            forward_filters: true,
        }
    }
}

impl AdapterConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the primary-key field, e.g. `_id`.
    #[must_use]
    pub fn primary_key_field(mut self, field: impl Into<String>) -> Self {
        self.primary_key_field = field.into();
        self
    }

    /// Sets the type-locator field.
    #[must_use]
    pub fn type_field(mut self, field: impl Into<String>) -> Self {
        self.type_field = field.into();
        self
    }

    /// Sets the default fetch limit.
    #[must_use]
    pub const fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = Some(limit);
        self
    }

    /// Sets whether fetch filters are sent to the backend.
    #[must_use]
    pub const fn forward_filters(mut self, value: bool) -> Self {
        self.forward_filters = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AdapterConfig::default();
        assert_eq!(config.primary_key_field, "pkey");
        assert_eq!(config.type_field, "__type__");
        assert_eq!(config.default_limit, None);
        assert!(config.forward_filters);
    }

    #[test]
    fn builder_pattern() {
        let config = AdapterConfig::new()
            .primary_key_field("_id")
            .default_limit(100)
            .forward_filters(false);

        assert_eq!(config.primary_key_field, "_id");
        assert_eq!(config.default_limit, Some(100));
        assert!(!config.forward_filters);
    }
}
