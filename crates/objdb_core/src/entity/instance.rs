//! Entity instances.

use super::signals::SignalEvent;
use super::types::{EntityKind, EntityType};
use crate::collection::EntityCollection;
use crate::error::{CoreError, CoreResult};
use crate::value::{describe_types, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// An instance of a registered entity type.
///
/// Every declared attribute always has a value (possibly `Null`); writes go
/// through [`set`](Self::set), which re-checks the declaration, the value
/// type and the attribute's choices.
///
/// Two entities are equal when they have the same type and the same primary
/// key. Entities without a key are only equal to themselves and their
/// clones.
#[derive(Clone)]
pub struct Entity {
    entity_type: Arc<EntityType>,
    pkey: Option<String>,
    values: BTreeMap<String, Value>,
    instance: u64,
}

impl Entity {
    /// Constructs and validates an entity.
    ///
    /// Attributes are completed with defaults, type- and choice-checked,
    /// then run through the type's clean hook and attribute validators.
    /// In-memory entities also receive a UUID key and enter their type's
    /// cache.
    ///
    /// # Errors
    ///
    /// - `UnregisteredAttribute` for undeclared names
    /// - `AttributeRequired` for missing required attributes
    /// - `ValidationFailed` listing every rejected attribute
    /// - a cache error if the type's cache refuses the entity
    pub fn new<K, V>(entity_type: &Arc<EntityType>, attrs: impl IntoIterator<Item = (K, V)>) -> CoreResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut entity = Self::assemble(entity_type, attrs)?;
        if entity.pkey.is_none() {
            entity.run_validations()?;
        }
        entity_type
            .signals()
            .send(&SignalEvent::PostInit { entity: &entity });

        if entity_type.kind() == EntityKind::InMemory {
            entity.pkey = Some(Uuid::new_v4().to_string());
            if let Some(cache) = entity_type.cache() {
                cache.lock().insert(&entity)?;
            }
        }
        Ok(entity)
    }

    /// Rebuilds a stored entity without running validators.
    pub(crate) fn reconstruct(
        entity_type: &Arc<EntityType>,
        attrs: BTreeMap<String, Value>,
        pkey: Option<String>,
    ) -> CoreResult<Self> {
        let mut entity = Self::assemble(entity_type, attrs)?;
        entity.pkey = pkey;
        entity_type
            .signals()
            .send(&SignalEvent::PostInit { entity: &entity });
        Ok(entity)
    }

    fn assemble<K, V>(entity_type: &Arc<EntityType>, attrs: impl IntoIterator<Item = (K, V)>) -> CoreResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let provided = attrs.into_iter().map(|(k, v)| (k.into(), v.into()));
        let filtered = entity_type
            .config()
            .filter_attrs(entity_type.name(), provided)?;
        entity_type.signals().send(&SignalEvent::PreInit {
            entity_type,
            attrs: &filtered,
        });

        let mut entity = Self {
            entity_type: Arc::clone(entity_type),
            pkey: None,
            values: BTreeMap::new(),
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        };
        let mut errors = BTreeMap::new();
        for (name, value) in filtered {
            match entity.check(&name, &value) {
                Ok(()) => {
                    entity.values.insert(name, value);
                }
                Err(err) => {
                    errors.insert(name, err.to_string());
                }
            }
        }
        if !errors.is_empty() {
            return Err(CoreError::ValidationFailed {
                entity_type: entity_type.name().to_string(),
                errors,
            });
        }
        Ok(entity)
    }

    /// Returns the entity's type.
    #[must_use]
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.entity_type
    }

    /// Returns the primary key, if assigned.
    #[must_use]
    pub fn pkey(&self) -> Option<&str> {
        self.pkey.as_deref()
    }

    /// Returns `true` once the entity has a primary key.
    #[must_use]
    pub fn saved(&self) -> bool {
        self.pkey.is_some()
    }

    /// Returns the construction identity shared by clones.
    #[must_use]
    pub fn instance_id(&self) -> u64 {
        self.instance
    }

    /// Assigns the primary key.
    ///
    /// # Errors
    ///
    /// Returns `PrimaryKeyImmutable` if a different key is already set.
    pub fn set_pkey(&mut self, pkey: impl Into<String>) -> CoreResult<()> {
        let pkey = pkey.into();
        match &self.pkey {
            Some(current) if *current != pkey => Err(CoreError::PrimaryKeyImmutable {
                entity_type: self.entity_type.name().to_string(),
                current: current.clone(),
            }),
            _ => {
                self.pkey = Some(pkey);
                Ok(())
            }
        }
    }

    /// Returns a declared attribute's value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns a declared attribute or `pkey`, as lookups and ordering see
    /// them.
    pub(crate) fn field(&self, name: &str) -> Option<Value> {
        if name == "pkey" {
            return Some(self.pkey.clone().into());
        }
        self.values.get(name).cloned()
    }

    /// Returns every attribute value keyed by name.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Assigns an attribute.
    ///
    /// `Null` is always accepted for declared attributes.
    ///
    /// # Errors
    ///
    /// - `UnregisteredAttribute` if `name` is not declared
    /// - `TypeMismatch` if the value matches none of the declared types
    /// - `InvalidChoice` if the value is not one of the attribute's choices
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> CoreResult<()> {
        let value = value.into();
        self.check(name, &value)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    fn check(&self, name: &str, value: &Value) -> CoreResult<()> {
        let config = self.entity_type.config();
        let entity_type = self.entity_type.name();
        let types = config
            .types_of(name)
            .ok_or_else(|| CoreError::unregistered(entity_type, name))?;
        if value.is_null() {
            return Ok(());
        }
        if !types.iter().any(|ty| ty.matches(value)) {
            return Err(CoreError::TypeMismatch {
                entity_type: entity_type.to_string(),
                attribute: name.to_string(),
                expected: describe_types(types),
                found: value.kind().to_string(),
            });
        }
        if let Some(choices) = config.choices_for(name) {
            if !choices.contains(value) {
                return Err(CoreError::InvalidChoice {
                    entity_type: entity_type.to_string(),
                    attribute: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Overwrites every attribute that declares a default with it.
    ///
    /// # Errors
    ///
    /// Returns an error if a default factory produces an invalid value.
    pub fn set_defaults(&mut self) -> CoreResult<()> {
        let config = Arc::clone(&self.entity_type);
        for name in config.config().attribute_names() {
            if let Some(default) = config.config().default_for(name) {
                self.set(name, default.evaluate())?;
            }
        }
        Ok(())
    }

    /// Runs the clean hook and every attribute validator.
    ///
    /// The clean hook's message is reported under `detail`. Validators are
    /// skipped for `Null` values; the first failing validator of an
    /// attribute is reported.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` with every collected message.
    pub fn run_validations(&self) -> CoreResult<()> {
        let mut errors = BTreeMap::new();
        if let Some(clean) = self.entity_type.clean_hook() {
            if let Err(message) = clean(self) {
                errors.insert("detail".to_string(), message);
            }
        }

        let config = self.entity_type.config();
        for name in config.attribute_names() {
            let Some(value) = self.values.get(name).filter(|v| !v.is_null()) else {
                continue;
            };
            if let Some(message) = config
                .validators_for(name)
                .iter()
                .find_map(|validator| validator(value).err())
            {
                errors.insert(name.to_string(), message);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::ValidationFailed {
                entity_type: self.entity_type.name().to_string(),
                errors,
            })
        }
    }

    /// Returns every declared attribute in declaration order, then `pkey`.
    #[must_use]
    pub fn serialize(&self) -> Vec<(String, Value)> {
        let mut data: Vec<(String, Value)> = self
            .entity_type
            .config()
            .attribute_names()
            .map(|name| {
                let value = self.values.get(name).cloned().unwrap_or_default();
                (name.to_string(), value)
            })
            .collect();
        data.push(("pkey".to_string(), self.pkey.clone().into()));
        data
    }

    /// Returns a detached collection holding this entity `times` times.
    #[must_use]
    pub fn repeat(&self, times: usize) -> EntityCollection {
        let mut collection = EntityCollection::new(Arc::clone(&self.entity_type));
        collection.extend_unchecked(std::iter::repeat(self).take(times).cloned());
        collection
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        if !Arc::ptr_eq(&self.entity_type, &other.entity_type) {
            return false;
        }
        match (&self.pkey, &other.pkey) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.instance == other.instance,
            _ => false,
        }
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_type.locator().hash(state);
        match &self.pkey {
            Some(pkey) => pkey.hash(state),
            None => self.instance.hash(state),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pkey {
            Some(pkey) => write!(f, "<{} {pkey}>", self.entity_type.name()),
            None => write!(f, "<{} #{}>", self.entity_type.name(), self.instance),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type", &self.entity_type.name())
            .field("pkey", &self.pkey)
            .field("values", &self.values)
            .finish()
    }
}
