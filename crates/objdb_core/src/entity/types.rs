//! Entity types and their builders.

use super::instance::Entity;
use super::signals::Signals;
use crate::cache::{CachePolicy, EntityCache};
use crate::error::CoreResult;
use crate::schema::{ConfigKind, Configuration};
use crate::value::Value;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A type-level validation hook; its error is reported under `detail`.
pub type CleanHook = Arc<dyn Fn(&Entity) -> Result<(), String> + Send + Sync>;

/// Whether entities of a type are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Saved through a persistence adapter.
    Persistent,
    /// Kept in the type's bounded cache only.
    InMemory,
}

impl EntityKind {
    pub(crate) fn config_kind(self) -> ConfigKind {
        match self {
            Self::Persistent => ConfigKind::Persistent,
            Self::InMemory => ConfigKind::Base,
        }
    }
}

/// A registered entity type.
///
/// Entity types are created by [`Registry::register`](crate::Registry::register)
/// and shared as `Arc<EntityType>`. Their configuration is frozen.
pub struct EntityType {
    pub(crate) name: String,
    pub(crate) locator: String,
    pub(crate) kind: EntityKind,
    pub(crate) parent: Option<Arc<EntityType>>,
    pub(crate) config: Configuration,
    pub(crate) clean: Option<CleanHook>,
    pub(crate) signals: Signals,
    pub(crate) cache: Option<Mutex<EntityCache>>,
}

impl EntityType {
    /// Starts building a persistent entity type.
    pub fn persistent(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder::new(name.into(), EntityKind::Persistent)
    }

    /// Starts building an in-memory entity type.
    pub fn in_memory(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder::new(name.into(), EntityKind::InMemory)
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the registry locator.
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns `true` for persistent types.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.kind == EntityKind::Persistent
    }

    /// Returns the parent type, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<EntityType>> {
        self.parent.as_ref()
    }

    /// Returns the bound configuration.
    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Returns the lifecycle signal hub.
    #[must_use]
    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    /// Returns the bounded cache of an in-memory type.
    #[must_use]
    pub fn cache(&self) -> Option<&Mutex<EntityCache>> {
        self.cache.as_ref()
    }

    pub(crate) fn clean_hook(&self) -> Option<&CleanHook> {
        self.clean.as_ref()
    }

    /// Returns `true` if this type or one of its ancestors is registered
    /// under `locator`.
    #[must_use]
    pub fn is_a(&self, locator: &str) -> bool {
        let mut current = Some(self);
        while let Some(entity_type) = current {
            if entity_type.locator == locator {
                return true;
            }
            current = entity_type.parent.as_deref();
        }
        false
    }

    /// Constructs a validated entity of this type.
    ///
    /// # Errors
    ///
    /// See [`Entity::new`].
    pub fn create<K, V>(self: &Arc<Self>, attrs: impl IntoIterator<Item = (K, V)>) -> CoreResult<Entity>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Entity::new(self, attrs)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("locator", &self.locator)
            .field("kind", &self.kind)
            .field("parent", &self.parent.as_ref().map(|p| p.locator()))
            .finish_non_exhaustive()
    }
}

/// Describes an entity type before registration.
#[must_use]
pub struct EntityTypeBuilder {
    pub(crate) name: String,
    pub(crate) locator: Option<String>,
    pub(crate) kind: EntityKind,
    pub(crate) parent: Option<Arc<EntityType>>,
    pub(crate) config: Option<Configuration>,
    pub(crate) clean: Option<CleanHook>,
    pub(crate) cache_policy: CachePolicy,
}

impl EntityTypeBuilder {
    fn new(name: String, kind: EntityKind) -> Self {
        Self {
            name,
            locator: None,
            kind,
            parent: None,
            config: None,
            clean: None,
            cache_policy: CachePolicy::default(),
        }
    }

    /// Sets the registry locator; defaults to the type name.
    pub fn locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    /// Derives from a registered type, inheriting unset sub-schemas.
    pub fn extends(mut self, parent: &Arc<EntityType>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Sets the configuration.
    pub fn config(mut self, config: Configuration) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the type-level validation hook.
    pub fn clean(mut self, hook: impl Fn(&Entity) -> Result<(), String> + Send + Sync + 'static) -> Self {
        self.clean = Some(Arc::new(hook));
        self
    }

    /// Sets the cache policy of an in-memory type.
    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }
}
