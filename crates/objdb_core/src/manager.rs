//! Per-type manager: the entry point for querying and persisting one type.

use crate::collection::{Aggregate, EntityCollection, FetchOptions};
use crate::entity::{Entity, EntityType};
use crate::error::{CoreError, CoreResult};
use crate::persistence::PersistenceAdapter;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Binds an entity type to a persistence adapter.
///
/// Query helpers read through [`all`](Self::all) and then evaluate on the
/// fetched members, so every call reflects the current backend state.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use objdb_backend::InMemoryBackend;
/// use objdb_core::{Configuration, EntityManager, EntityType, PersistenceAdapter, Registry, ValueType};
///
/// let registry = Arc::new(Registry::new());
/// let book = registry
///     .register(
///         EntityType::persistent("Book")
///             .config(Configuration::persistent().with_attribute("title", [ValueType::Text])),
///     )
///     .unwrap();
/// let adapter = Arc::new(PersistenceAdapter::new(registry, Arc::new(InMemoryBackend::new())));
/// let books = EntityManager::new(book, adapter);
///
/// books.create([("title", "Dune")], true).unwrap();
/// assert_eq!(books.count().unwrap(), 1);
/// assert!(books.exists([("title__icontains", "dune")]).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct EntityManager {
    entity_type: Arc<EntityType>,
    adapter: Arc<PersistenceAdapter>,
}

impl EntityManager {
    /// Creates a manager for `entity_type`.
    #[must_use]
    pub fn new(entity_type: Arc<EntityType>, adapter: Arc<PersistenceAdapter>) -> Self {
        Self {
            entity_type,
            adapter,
        }
    }

    /// Returns the managed type.
    #[must_use]
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.entity_type
    }

    /// Returns the adapter.
    #[must_use]
    pub fn adapter(&self) -> &Arc<PersistenceAdapter> {
        &self.adapter
    }

    /// Returns an empty collection attached to the adapter.
    #[must_use]
    pub fn collection(&self) -> EntityCollection {
        EntityCollection::new(Arc::clone(&self.entity_type)).with_adapter(Arc::clone(&self.adapter))
    }

    fn check_type(&self, entity: &Entity) -> CoreResult<()> {
        if Arc::ptr_eq(entity.entity_type(), &self.entity_type) {
            Ok(())
        } else {
            Err(CoreError::wrong_type(
                self.entity_type.name(),
                entity.entity_type().name(),
            ))
        }
    }

    // ---- queries ----

    /// Returns every stored entity.
    ///
    /// # Errors
    ///
    /// Returns the fetch or decoding error.
    pub fn all(&self) -> CoreResult<EntityCollection> {
        self.fetch(&FetchOptions::new())
    }

    /// Returns the stored entities the backend selects with `options`.
    ///
    /// # Errors
    ///
    /// Returns the fetch or decoding error.
    pub fn fetch(&self, options: &FetchOptions) -> CoreResult<EntityCollection> {
        self.collection().all(options)
    }

    /// Returns the stored entities matching every lookup.
    ///
    /// # Errors
    ///
    /// Returns the fetch error or a lookup error.
    pub fn filter<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<EntityCollection>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.all()?.filter(lookups)
    }

    /// Returns the stored entities matching none of the lookups.
    ///
    /// # Errors
    ///
    /// Returns the fetch error or a lookup error.
    pub fn exclude<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<EntityCollection>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.all()?.exclude(lookups)
    }

    /// Returns the single stored entity matching the lookups.
    ///
    /// # Errors
    ///
    /// `DoesNotExist`, `MultipleObjectsReturned`, or the fetch error.
    pub fn get<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<Entity>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.all()?.get(lookups)
    }

    /// Returns `true` if a stored entity matches the lookups.
    ///
    /// # Errors
    ///
    /// Returns the fetch error or a lookup error.
    pub fn exists<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<bool>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.all()?.exists(lookups)
    }

    /// Returns `true` if an entity with `pkey` is stored.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub fn exists_pkey(&self, pkey: &str) -> CoreResult<bool> {
        let options = FetchOptions::new().filter("pkey", pkey).limit(1);
        Ok(!self.fetch(&options)?.is_empty())
    }

    /// Returns the number of stored entities.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub fn count(&self) -> CoreResult<usize> {
        Ok(self.all()?.count())
    }

    /// Returns the first stored entity in declared order.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub fn first(&self) -> CoreResult<Option<Entity>> {
        Ok(self.all()?.first().cloned())
    }

    /// Returns the last stored entity in declared order.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub fn last(&self) -> CoreResult<Option<Entity>> {
        Ok(self.all()?.last().cloned())
    }

    /// Returns every stored entity sorted by `attributes`.
    ///
    /// # Errors
    ///
    /// See [`EntityCollection::order_by`].
    pub fn order_by<S: AsRef<str>>(&self, attributes: impl IntoIterator<Item = S>) -> CoreResult<EntityCollection> {
        self.all()?.order_by(attributes)
    }

    /// Evaluates `aggregate` over every stored entity.
    ///
    /// # Errors
    ///
    /// See [`EntityCollection::aggregate`].
    pub fn aggregate(&self, aggregate: Aggregate) -> CoreResult<BTreeMap<String, Value>> {
        self.all()?.aggregate(aggregate)
    }

    // ---- writes ----

    /// Constructs an entity and, if `persist` is set and the type is
    /// persistent, saves it.
    ///
    /// # Errors
    ///
    /// Returns the construction or save error.
    pub fn create<K, V>(&self, attrs: impl IntoIterator<Item = (K, V)>, persist: bool) -> CoreResult<Entity>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut entity = self.entity_type.create(attrs)?;
        if persist && self.entity_type.is_persistent() {
            self.adapter.save(&mut entity)?;
        }
        Ok(entity)
    }

    /// Returns the stored entity matching the lookups, or creates and
    /// saves one from the lookups that name a plain attribute.
    ///
    /// The flag is `true` when the entity was created.
    ///
    /// # Errors
    ///
    /// `MultipleObjectsReturned`, a lookup or fetch error, or the
    /// construction or save error.
    pub fn get_or_create<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<(Entity, bool)>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let lookups = crate::collection::lookups(lookups)?;
        let pairs = lookups
            .iter()
            .map(|lookup| (lookup.key().to_string(), lookup.value().clone()));
        match self.get(pairs) {
            Ok(entity) => Ok((entity, false)),
            Err(err) if err.is_does_not_exist() => {
                let attrs = lookups.iter().filter_map(|lookup| {
                    lookup
                        .bare_attribute()
                        .map(|name| (name.to_string(), lookup.value().clone()))
                });
                let entity = self.create(attrs, true)?;
                debug!(entity_type = %self.entity_type.name(), entity = %entity, "created missing entity");
                Ok((entity, true))
            }
            Err(err) => Err(err),
        }
    }

    /// Assigns `attrs` on every stored entity and saves them all.
    ///
    /// The members are read first and written back afterwards; writes made
    /// by others in between are overwritten. In-memory entities are
    /// written back to the type's cache. Returns the number of entities
    /// updated.
    ///
    /// # Errors
    ///
    /// Returns an attribute error before anything is saved, or the first
    /// save failure once every save has finished.
    pub async fn update<K, V>(&self, attrs: impl IntoIterator<Item = (K, V)>) -> CoreResult<usize>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let attrs: Vec<(String, Value)> = attrs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        let mut members = self.all()?.into_vec();
        if members.is_empty() {
            return Ok(0);
        }
        for entity in &mut members {
            for (name, value) in &attrs {
                entity.set(name, value.clone())?;
            }
        }

        if let Some(cache) = self.entity_type.cache() {
            let mut cache = cache.lock();
            for entity in &members {
                cache.update(entity)?;
            }
        } else {
            self.adapter.save_many(&mut members).await?;
        }
        info!(entity_type = %self.entity_type.name(), count = members.len(), "updated entities");
        Ok(members.len())
    }

    /// Saves entities of this type concurrently.
    ///
    /// All saves complete before the first failure is reported; nothing is
    /// rolled back. Keys assigned by successful inserts are written into
    /// `entities`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty batch, `WrongEntityType` before
    /// anything is saved, or the first save failure.
    pub async fn bulk_save(&self, entities: &mut [Entity]) -> CoreResult<()> {
        if entities.is_empty() {
            return Err(CoreError::invalid_argument("No entities provided."));
        }
        for entity in entities.iter() {
            self.check_type(entity)?;
        }
        self.adapter.save_many(entities).await
    }

    /// Saves one entity. Returns `true` if it was inserted.
    ///
    /// In-memory entities are validated and written back over their cached
    /// record; they are never inserted.
    ///
    /// # Errors
    ///
    /// `WrongEntityType`, `ValidationFailed`, a cache error for an
    /// in-memory entity that is no longer cached, or the save error.
    pub fn save(&self, entity: &mut Entity) -> CoreResult<bool> {
        self.check_type(entity)?;
        match self.entity_type.cache() {
            Some(cache) => {
                entity.run_validations()?;
                cache.lock().update(entity)?;
                Ok(false)
            }
            None => self.adapter.save(entity),
        }
    }

    /// Deletes one saved entity.
    ///
    /// # Errors
    ///
    /// `WrongEntityType` or the delete error.
    pub fn delete(&self, entity: &Entity) -> CoreResult<()> {
        self.check_type(entity)?;
        self.adapter.delete(entity)
    }

    /// Deletes entities of this type concurrently.
    ///
    /// # Errors
    ///
    /// `WrongEntityType` before anything is deleted, or the first delete
    /// failure.
    pub async fn bulk_delete(&self, entities: impl IntoIterator<Item = Entity>) -> CoreResult<()> {
        self.collection().bulk_delete(entities).await
    }

    /// Ensures the type's collection exists. Returns `true` if it was
    /// created.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub fn migrate(&self) -> CoreResult<bool> {
        self.adapter.migrate(&self.entity_type)
    }

    /// Deletes every stored entity of the type. Returns how many were
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns the fetch error or the first delete failure.
    pub async fn flush(&self) -> CoreResult<usize> {
        self.adapter.flush(&self.entity_type).await
    }
}
