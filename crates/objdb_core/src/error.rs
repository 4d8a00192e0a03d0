//! Error types for objdb core.

use objdb_backend::BackendError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in objdb core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An entity type or its configuration is invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The attribute is not declared by the entity type.
    #[error("`{attribute}` is not a registered attribute of {entity_type}")]
    UnregisteredAttribute {
        /// The entity type name.
        entity_type: String,
        /// The offending attribute.
        attribute: String,
    },

    /// A required attribute was not provided.
    #[error("attribute `{attribute}` of {entity_type} is required")]
    AttributeRequired {
        /// The entity type name.
        entity_type: String,
        /// The missing attribute.
        attribute: String,
    },

    /// A value does not match any of the attribute's declared types.
    #[error("attribute `{attribute}` of {entity_type} must be any of ({expected}), got {found}")]
    TypeMismatch {
        /// The entity type name.
        entity_type: String,
        /// The attribute being assigned.
        attribute: String,
        /// The declared types.
        expected: String,
        /// The kind of the rejected value.
        found: String,
    },

    /// A value is not one of the attribute's choices.
    #[error("{value} is not a valid choice for attribute `{attribute}` of {entity_type}")]
    InvalidChoice {
        /// The entity type name.
        entity_type: String,
        /// The attribute being assigned.
        attribute: String,
        /// The rejected value, rendered.
        value: String,
    },

    /// One or more validators rejected the entity.
    #[error("validation failed for {entity_type}: {}", render_errors(.errors))]
    ValidationFailed {
        /// The entity type name.
        entity_type: String,
        /// Attribute name (or `detail`) to message.
        errors: BTreeMap<String, String>,
    },

    /// The primary key was already set to a different value.
    #[error("primary key of {entity_type} is already set to {current:?}")]
    PrimaryKeyImmutable {
        /// The entity type name.
        entity_type: String,
        /// The existing key.
        current: String,
    },

    /// An entity of another type was offered to a typed container.
    #[error("expected an entity of type {expected}, got {found}")]
    WrongEntityType {
        /// The container's type.
        expected: String,
        /// The offered entity's type.
        found: String,
    },

    /// A lookup expression could not be evaluated.
    #[error("lookup error: {message}")]
    Lookup {
        /// Description of the problem.
        message: String,
    },

    /// No entity matched a `get`.
    #[error("{entity_type}DoesNotExist: {message}")]
    DoesNotExist {
        /// The entity type name.
        entity_type: String,
        /// Description of the query.
        message: String,
    },

    /// More than one entity matched a `get`.
    #[error("Multiple{entity_type}sReturned: {count} entities matched")]
    MultipleObjectsReturned {
        /// The entity type name.
        entity_type: String,
        /// Number of matches.
        count: usize,
    },

    /// Persistence failed.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The bounded cache rejected an operation.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// An argument was out of range or empty.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// A background task panicked or was aborted.
    #[error("background task failed: {message}")]
    TaskFailed {
        /// Description of the failure.
        message: String,
    },
}

fn render_errors(errors: &BTreeMap<String, String>) -> String {
    errors
        .iter()
        .map(|(key, message)| format!("{key}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl CoreError {
    /// Creates a lookup error.
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }

    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an unregistered-attribute error.
    pub fn unregistered(entity_type: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::UnregisteredAttribute {
            entity_type: entity_type.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates a wrong-entity-type error.
    pub fn wrong_type(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::WrongEntityType {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Returns `true` for the `DoesNotExist` cardinality error.
    #[must_use]
    pub fn is_does_not_exist(&self) -> bool {
        matches!(self, Self::DoesNotExist { .. })
    }
}

/// Errors raised while binding configurations to entity types.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The entity type was registered without a configuration.
    #[error("{entity_type} has no configuration")]
    MissingConfiguration {
        /// The entity type name.
        entity_type: String,
    },

    /// Another type is already registered under the locator.
    #[error("an entity type is already registered as `{locator}`")]
    DuplicateEntityType {
        /// The contested locator.
        locator: String,
    },

    /// The configuration is already bound to another type.
    #[error("configuration for {entity_type} is already bound to {bound_to}; build a new one")]
    ConfigurationInUse {
        /// The type being registered.
        entity_type: String,
        /// The type that owns the configuration.
        bound_to: String,
    },

    /// The configuration kind does not fit the entity kind.
    #[error("{entity_type}: {message}")]
    WrongConfigurationKind {
        /// The type being registered.
        entity_type: String,
        /// Description of the mismatch.
        message: String,
    },

    /// A sub-schema names an attribute that is not declared.
    #[error("`{attribute}` in `{subconfig}` of {entity_type} is not a registered attribute")]
    UnregisteredAttribute {
        /// The type being registered.
        entity_type: String,
        /// The sub-schema (`choices`, `required`...).
        subconfig: &'static str,
        /// The unknown attribute.
        attribute: String,
    },

    /// A sub-schema contains the same entry twice.
    #[error("`{subconfig}` of {entity_type} contains duplicates: {entry}")]
    Duplicates {
        /// The type being registered.
        entity_type: String,
        /// The sub-schema.
        subconfig: &'static str,
        /// The repeated entry.
        entry: String,
    },

    /// A sub-schema entry is malformed.
    #[error("invalid `{subconfig}` of {entity_type}: {message}")]
    Invalid {
        /// The type being registered.
        entity_type: String,
        /// The sub-schema.
        subconfig: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// A locator does not name a registered type.
    #[error("no entity type is registered as `{locator}`")]
    UnknownEntityType {
        /// The unknown locator.
        locator: String,
    },
}

impl SchemaError {
    pub(crate) fn invalid(
        entity_type: &str,
        subconfig: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            entity_type: entity_type.to_string(),
            subconfig,
            message: message.into(),
        }
    }
}

/// Errors raised by the persistence adapter.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Fetching documents failed.
    #[error("failed to fetch from `{collection}`: {source}")]
    Fetch {
        /// The collection queried.
        collection: String,
        /// The backend failure.
        #[source]
        source: BackendError,
    },

    /// Inserting a document failed.
    #[error("failed to insert into `{collection}`: {source}")]
    Insert {
        /// The target collection.
        collection: String,
        /// The backend failure.
        #[source]
        source: BackendError,
    },

    /// Updating a document failed or matched nothing.
    #[error("failed to update {pkey} in `{collection}`: {message}")]
    Update {
        /// The target collection.
        collection: String,
        /// The document key.
        pkey: String,
        /// Description of the failure.
        message: String,
        /// The backend failure, if any.
        #[source]
        source: Option<BackendError>,
    },

    /// Deleting a document failed or matched nothing.
    #[error("failed to delete {pkey} from `{collection}`: {message}")]
    Delete {
        /// The target collection.
        collection: String,
        /// The document key.
        pkey: String,
        /// Description of the failure.
        message: String,
        /// The backend failure, if any.
        #[source]
        source: Option<BackendError>,
    },

    /// Creating a collection failed.
    #[error("failed to create collection `{collection}`: {source}")]
    CreateCollection {
        /// The collection.
        collection: String,
        /// The backend failure.
        #[source]
        source: BackendError,
    },

    /// A document could not be converted to or from an entity.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// The entity type is not persisted.
    #[error("{entity_type} does not support persistence")]
    NotPersistent {
        /// The entity type name.
        entity_type: String,
    },

    /// The entity has no primary key yet.
    #[error("{entity_type} has not been saved yet")]
    Unsaved {
        /// The entity type name.
        entity_type: String,
    },

    /// No adapter is attached where one is needed.
    #[error("no backend is attached for {entity_type}")]
    NoBackend {
        /// The entity type name.
        entity_type: String,
    },

    /// A preferred backend name is not configured on the adapter.
    #[error("no backend named `{name}` is configured")]
    UnknownBackend {
        /// The requested name.
        name: String,
    },
}

impl DatabaseError {
    /// Creates an invalid-document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }
}

/// Errors raised by [`crate::EntityCache`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache is at capacity.
    #[error("Cache is full")]
    Full,

    /// The key is not in the cache.
    #[error("Object not found: {pkey}")]
    NotFound {
        /// The missing key.
        pkey: String,
    },

    /// The entity's type does not match the cache.
    #[error("cache holds {expected} entities, got {found}")]
    WrongType {
        /// The cache's type.
        expected: String,
        /// The offered entity's type.
        found: String,
    },

    /// The entity has no primary key to cache under.
    #[error("{entity_type} entity has no primary key")]
    MissingKey {
        /// The entity type name.
        entity_type: String,
    },

    /// The live register violates the cache invariants.
    #[error("Cache for {entity_type} is corrupt: {message}")]
    Corrupt {
        /// The cache's type.
        entity_type: String,
        /// The violated invariant.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_render_all_messages() {
        let mut errors = BTreeMap::new();
        errors.insert("name".to_string(), "may not be blank".to_string());
        errors.insert("detail".to_string(), "bad".to_string());
        let err = CoreError::ValidationFailed {
            entity_type: "Person".into(),
            errors,
        };
        assert_eq!(
            err.to_string(),
            "validation failed for Person: detail: bad; name: may not be blank"
        );
    }

    #[test]
    fn cardinality_errors_are_type_specific() {
        let err = CoreError::DoesNotExist {
            entity_type: "Book".into(),
            message: "no match".into(),
        };
        assert!(err.is_does_not_exist());
        assert!(err.to_string().starts_with("BookDoesNotExist"));

        let err = CoreError::MultipleObjectsReturned {
            entity_type: "Book".into(),
            count: 2,
        };
        assert!(err.to_string().starts_with("MultipleBooksReturned"));
    }

    #[test]
    fn backend_errors_stay_as_sources() {
        let err: CoreError = DatabaseError::Fetch {
            collection: "books".into(),
            source: BackendError::collection_not_found("books"),
        }
        .into();
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "collection not found: books");
    }

    #[test]
    fn cache_messages() {
        assert_eq!(CacheError::Full.to_string(), "Cache is full");
        let err = CacheError::NotFound { pkey: "k".into() };
        assert_eq!(err.to_string(), "Object not found: k");
    }
}
