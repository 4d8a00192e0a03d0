//! Registry of entity types keyed by locator.

use super::types::{EntityType, EntityTypeBuilder};
use crate::cache::EntityCache;
use crate::error::{CoreResult, SchemaError};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Binds configurations to entity types and resolves locators.
///
/// Registration is the only place a [`Configuration`](crate::Configuration)
/// is validated. Wire decoding resolves nested `__type__` tags through the
/// registry, so every type that can appear nested must be registered in the
/// same registry as the adapter uses.
///
/// # Example
///
/// ```rust
/// use objdb_core::{Configuration, EntityType, Registry, ValueType};
///
/// let registry = Registry::new();
/// let book = registry
///     .register(
///         EntityType::persistent("Book").config(
///             Configuration::persistent().with_attribute("title", [ValueType::Text]),
///         ),
///     )
///     .unwrap();
/// assert!(registry.get("Book").is_some());
/// assert_eq!(book.config().bound_to(), Some("Book"));
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    types: RwLock<BTreeMap<String, Arc<EntityType>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a type description and registers it.
    ///
    /// Sub-schemas left empty are filled from the ancestors, root first,
    /// before validation. The configuration is then bound to the new type.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the configuration is missing, already
    /// bound, of the wrong kind or invalid, if the locator is taken, or if
    /// the parent is not registered here.
    pub fn register(&self, builder: EntityTypeBuilder) -> CoreResult<Arc<EntityType>> {
        let EntityTypeBuilder {
            name,
            locator,
            kind,
            parent,
            config,
            clean,
            cache_policy,
        } = builder;
        let locator = locator.unwrap_or_else(|| name.clone());

        let mut config = config.ok_or_else(|| SchemaError::MissingConfiguration {
            entity_type: name.clone(),
        })?;
        if let Some(bound_to) = config.bound_to() {
            return Err(SchemaError::ConfigurationInUse {
                entity_type: name,
                bound_to: bound_to.to_string(),
            }
            .into());
        }
        config.check_kind(&name, kind.config_kind())?;

        let mut types = self.types.write();
        if types.contains_key(&locator) {
            return Err(SchemaError::DuplicateEntityType { locator }.into());
        }

        if let Some(parent) = &parent {
            let registered = types
                .get(parent.locator())
                .is_some_and(|known| Arc::ptr_eq(known, parent));
            if !registered {
                return Err(SchemaError::UnknownEntityType {
                    locator: parent.locator().to_string(),
                }
                .into());
            }
            if parent.kind() != kind {
                return Err(SchemaError::WrongConfigurationKind {
                    entity_type: name,
                    message: format!("cannot extend {:?} type {}", parent.kind(), parent.name()),
                }
                .into());
            }

            let mut ancestors = Vec::new();
            let mut current = Some(parent);
            while let Some(ancestor) = current {
                ancestors.push(Arc::clone(ancestor));
                current = ancestor.parent();
            }
            for ancestor in ancestors.iter().rev() {
                debug!(entity_type = %name, ancestor = %ancestor.name(), "inheriting configuration");
                config.inherit(ancestor.config());
            }
        }

        config.validate(&name, &|referenced| {
            referenced == locator || types.contains_key(referenced)
        })?;
        config.bind(&locator);

        let entity_type = Arc::new_cyclic(|this| EntityType {
            cache: (kind == super::EntityKind::InMemory).then(|| {
                Mutex::new(EntityCache::bound(
                    this.clone(),
                    name.clone(),
                    locator.clone(),
                    cache_policy,
                ))
            }),
            name,
            locator: locator.clone(),
            kind,
            parent,
            config,
            clean,
            signals: Default::default(),
        });
        types.insert(locator, Arc::clone(&entity_type));

        info!(
            entity_type = %entity_type.name(),
            locator = %entity_type.locator(),
            kind = ?entity_type.kind(),
            "registered entity type"
        );
        Ok(entity_type)
    }

    /// Returns the type registered under `locator`.
    #[must_use]
    pub fn get(&self, locator: &str) -> Option<Arc<EntityType>> {
        self.types.read().get(locator).cloned()
    }

    /// Returns the type registered under `locator`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if nothing is registered there.
    pub fn resolve(&self, locator: &str) -> CoreResult<Arc<EntityType>> {
        self.get(locator).ok_or_else(|| {
            SchemaError::UnknownEntityType {
                locator: locator.to_string(),
            }
            .into()
        })
    }

    /// Returns `true` if `locator` is registered.
    #[must_use]
    pub fn contains(&self, locator: &str) -> bool {
        self.types.read().contains_key(locator)
    }

    /// Returns every registered locator in sorted order.
    #[must_use]
    pub fn locators(&self) -> Vec<String> {
        self.types.read().keys().cloned().collect()
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Returns `true` if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Disconnects every signal receiver and empties every cache.
    ///
    /// Types stay registered.
    pub fn reset(&self) {
        for entity_type in self.types.read().values() {
            entity_type.signals().reset();
            if let Some(cache) = entity_type.cache() {
                cache.lock().clear();
            }
        }
        debug!("registry state reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::{Configuration, StorageOptions, Value, ValueType};

    fn base() -> Configuration {
        Configuration::new()
            .with_attribute("name", [ValueType::Text])
            .with_attribute("age", [ValueType::Int])
            .with_required(["name"])
            .with_ordering(["name"])
    }

    fn schema_error(err: CoreError) -> SchemaError {
        match err {
            CoreError::Schema(err) => err,
            other => panic!("expected a schema error, got {other}"),
        }
    }

    #[test]
    fn missing_configuration_is_rejected() {
        let registry = Registry::new();
        let err = registry.register(EntityType::in_memory("Ghost")).unwrap_err();
        assert!(matches!(
            schema_error(err),
            SchemaError::MissingConfiguration { .. }
        ));
    }

    #[test]
    fn duplicate_locator_is_rejected() {
        let registry = Registry::new();
        registry
            .register(EntityType::in_memory("Human").config(base()))
            .unwrap();
        let err = registry
            .register(EntityType::in_memory("Human").config(base()))
            .unwrap_err();
        assert!(matches!(
            schema_error(err),
            SchemaError::DuplicateEntityType { .. }
        ));
    }

    #[test]
    fn bound_configuration_cannot_be_reused() {
        let registry = Registry::new();
        let human = registry
            .register(EntityType::in_memory("Human").config(base()))
            .unwrap();
        let err = registry
            .register(EntityType::in_memory("Clone").config(human.config().clone()))
            .unwrap_err();
        assert!(matches!(
            schema_error(err),
            SchemaError::ConfigurationInUse { ref bound_to, .. } if bound_to == "Human"
        ));
    }

    #[test]
    fn configuration_kind_must_match_entity_kind() {
        let registry = Registry::new();
        let err = registry
            .register(EntityType::persistent("Book").config(base()))
            .unwrap_err();
        assert!(matches!(
            schema_error(err),
            SchemaError::WrongConfigurationKind { .. }
        ));

        let err = registry
            .register(
                EntityType::in_memory("Draft").config(
                    Configuration::new()
                        .with_attribute("title", [ValueType::Text])
                        .with_storage(StorageOptions::new().daily_partition(true)),
                ),
            )
            .unwrap_err();
        assert!(matches!(
            schema_error(err),
            SchemaError::WrongConfigurationKind { .. }
        ));
    }

    #[test]
    fn child_inherits_unset_subconfigs() {
        let registry = Registry::new();
        let human = registry
            .register(EntityType::in_memory("Human").config(base()))
            .unwrap();
        let woman = registry
            .register(
                EntityType::in_memory("Woman")
                    .extends(&human)
                    .config(Configuration::new().with_ordering(["-age"])),
            )
            .unwrap();

        let config = woman.config();
        assert_eq!(config.attribute_names().collect::<Vec<_>>(), ["name", "age"]);
        assert_eq!(config.ordering(), ["-age".to_string()]);
        assert!(config.is_required("name"));
        assert!(woman.is_a("Human"));
        assert!(!human.is_a("Woman"));
    }

    #[test]
    fn root_ancestor_fills_before_intermediate_ones() {
        let registry = Registry::new();
        let root = registry
            .register(EntityType::in_memory("Root").config(base()))
            .unwrap();
        let middle = registry
            .register(
                EntityType::in_memory("Middle")
                    .extends(&root)
                    .config(Configuration::new().with_ordering(["-age"])),
            )
            .unwrap();
        let leaf = registry
            .register(
                EntityType::in_memory("Leaf")
                    .extends(&middle)
                    .config(Configuration::new().with_default("age", 1)),
            )
            .unwrap();

        assert_eq!(leaf.config().ordering(), ["name".to_string()]);
        assert_eq!(leaf.config().get_default_for("age"), Value::Int(1));
    }

    #[test]
    fn parent_must_be_registered_here() {
        let other = Registry::new();
        let human = other
            .register(EntityType::in_memory("Human").config(base()))
            .unwrap();

        let registry = Registry::new();
        let err = registry
            .register(
                EntityType::in_memory("Woman")
                    .extends(&human)
                    .config(Configuration::new()),
            )
            .unwrap_err();
        assert!(matches!(
            schema_error(err),
            SchemaError::UnknownEntityType { .. }
        ));
    }

    #[test]
    fn entity_attributes_may_reference_registered_or_own_types() {
        let registry = Registry::new();
        registry
            .register(
                EntityType::persistent("Author").config(
                    Configuration::persistent().with_attribute("name", [ValueType::Text]),
                ),
            )
            .unwrap();
        registry
            .register(
                EntityType::persistent("Book").config(
                    Configuration::persistent()
                        .with_attribute("author", [ValueType::entity("Author")])
                        .with_attribute("sequel", [ValueType::entity("Book"), ValueType::Null]),
                ),
            )
            .unwrap();

        assert_eq!(registry.locators(), ["Author", "Book"]);
        assert!(registry.resolve("Magazine").is_err());
    }

    #[test]
    fn reset_clears_signals_and_caches() {
        let registry = Registry::new();
        let human = registry
            .register(EntityType::in_memory("Human").config(base()))
            .unwrap();
        human
            .signals()
            .connect(crate::Signal::PostInit, |_| {});
        human.create([("name", "Ada")]).unwrap();

        registry.reset();
        assert_eq!(human.signals().receiver_count(crate::Signal::PostInit), 0);
        assert!(human.cache().unwrap().lock().is_empty());
        assert_eq!(registry.len(), 1);
    }
}
