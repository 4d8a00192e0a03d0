//! The persistence adapter: entity lifecycle on top of document backends.

use super::naming;
use super::wire::WireFormat;
use crate::collection::FetchOptions;
use crate::config::AdapterConfig;
use crate::entity::{Entity, EntityType, Registry, SignalEvent};
use crate::error::{CoreResult, DatabaseError};
use crate::fanout::fan_out;
use crate::schema::StorageOptions;
use chrono::Utc;
use objdb_backend::{BackendError, BackendResult, DocumentBackend, FetchRequest};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Binds entity types to document backends.
///
/// The adapter owns a default backend and any number of named ones; a type
/// whose [`StorageOptions::preferred_backend`] is set is routed to the
/// backend of that name. Collection names are derived per call, so daily
/// partitions roll over at UTC midnight without a restart.
///
/// Bulk operations take `self: &Arc<Self>` so their tasks can share the
/// adapter across blocking worker threads.
pub struct PersistenceAdapter {
    registry: Arc<Registry>,
    config: AdapterConfig,
    backend: Arc<dyn DocumentBackend>,
    named: BTreeMap<String, Arc<dyn DocumentBackend>>,
}

impl PersistenceAdapter {
    /// Creates an adapter with the default configuration.
    pub fn new(registry: Arc<Registry>, backend: Arc<dyn DocumentBackend>) -> Self {
        Self::with_config(registry, backend, AdapterConfig::default())
    }

    /// Creates an adapter with a custom configuration.
    pub fn with_config(
        registry: Arc<Registry>,
        backend: Arc<dyn DocumentBackend>,
        config: AdapterConfig,
    ) -> Self {
        info!(
            backend = backend.name(),
            primary_key_field = %config.primary_key_field,
            "persistence adapter ready"
        );
        Self {
            registry,
            config,
            backend,
            named: BTreeMap::new(),
        }
    }

    /// Registers a named backend for types that prefer it.
    #[must_use]
    pub fn with_backend(mut self, name: impl Into<String>, backend: Arc<dyn DocumentBackend>) -> Self {
        self.named.insert(name.into(), backend);
        self
    }

    /// Returns the registry nested documents are resolved through.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Returns the adapter configuration.
    #[must_use]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Returns the wire mapping used by this adapter.
    #[must_use]
    pub fn wire(&self) -> WireFormat<'_> {
        WireFormat::new(&self.registry, &self.config)
    }

    /// Returns the backend serving `entity_type`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBackend` if the type prefers a backend that was not
    /// registered.
    pub fn backend_for(&self, entity_type: &EntityType) -> CoreResult<&Arc<dyn DocumentBackend>> {
        match &entity_type.config().storage().preferred_backend {
            Some(name) => self
                .named
                .get(name)
                .ok_or_else(|| DatabaseError::UnknownBackend { name: name.clone() }.into()),
            None => Ok(&self.backend),
        }
    }

    /// Returns today's collection name of `entity_type`.
    #[must_use]
    pub fn collection_name(&self, entity_type: &EntityType) -> String {
        naming::collection_name(
            entity_type.name(),
            entity_type.config().storage(),
            Utc::now().date_naive(),
        )
    }

    fn require_persistent(entity_type: &EntityType) -> CoreResult<()> {
        if entity_type.is_persistent() {
            Ok(())
        } else {
            Err(DatabaseError::NotPersistent {
                entity_type: entity_type.name().to_string(),
            }
            .into())
        }
    }

    /// Runs `op`; if the collection is missing and the type opts in, creates
    /// it and runs `op` once more. The outer error is a failed creation.
    fn with_collection<T>(
        storage: &StorageOptions,
        backend: &dyn DocumentBackend,
        collection: &str,
        op: impl Fn() -> BackendResult<T>,
    ) -> CoreResult<BackendResult<T>> {
        match op() {
            Err(err) if err.is_collection_not_found() && storage.auto_create_collection => {
                warn!(collection, "collection missing, creating it and retrying");
                backend
                    .create_collection(collection)
                    .map_err(|source| DatabaseError::CreateCollection {
                        collection: collection.to_string(),
                        source,
                    })?;
                Ok(op())
            }
            result => Ok(result),
        }
    }

    /// Fetches stored entities of `entity_type`.
    ///
    /// Equality filters, limit and offset are sent to the backend unless
    /// [`AdapterConfig::forward_filters`] is off, in which case they are
    /// applied to the decoded entities. The configured default limit
    /// applies when `options` sets none.
    ///
    /// # Errors
    ///
    /// Returns `NotPersistent`, `UnknownBackend`, a `Fetch` error wrapping
    /// the backend failure, or a decoding error.
    pub fn fetch(&self, entity_type: &Arc<EntityType>, options: &FetchOptions) -> CoreResult<Vec<Entity>> {
        self.fetch_limited(entity_type, options, self.config.default_limit)
    }

    fn fetch_limited(
        &self,
        entity_type: &Arc<EntityType>,
        options: &FetchOptions,
        default_limit: Option<usize>,
    ) -> CoreResult<Vec<Entity>> {
        Self::require_persistent(entity_type)?;
        let backend = self.backend_for(entity_type)?;
        let collection = self.collection_name(entity_type);
        let wire = self.wire();
        let limit = options.limit.or(default_limit);

        let mut request = FetchRequest::new().key_field(self.config.primary_key_field.clone());
        if self.config.forward_filters {
            for (attribute, value) in &options.filters {
                let field = if attribute == "pkey" {
                    self.config.primary_key_field.as_str()
                } else {
                    attribute.as_str()
                };
                request = request.filter(field, wire.encode_value(value)?);
            }
            if let Some(limit) = limit {
                request = request.limit(limit);
            }
            if let Some(offset) = options.offset {
                request = request.offset(offset);
            }
        }

        let documents = Self::with_collection(
            entity_type.config().storage(),
            backend.as_ref(),
            &collection,
            || backend.fetch(&collection, &request),
        )?
        .map_err(|source| DatabaseError::Fetch {
            collection: collection.clone(),
            source,
        })?;
        debug!(collection = %collection, documents = documents.len(), "fetched documents");

        let entities = documents
            .iter()
            .map(|document| wire.decode(entity_type, document))
            .collect::<CoreResult<Vec<_>>>()?;
        if self.config.forward_filters {
            return Ok(entities);
        }
        let mut local = options.clone();
        local.limit = limit;
        local.apply_locally(entities)
    }

    /// Saves an entity, inserting it when it has no primary key yet.
    ///
    /// Emits `PreSave`, stamps the timestamp-refresh attributes with the
    /// current UTC time, runs validations, writes the document and emits
    /// `PostSave`. An insert stores the key the backend assigns. A failed
    /// save leaves `entity` untouched.
    ///
    /// Returns `true` if a new document was inserted.
    ///
    /// # Errors
    ///
    /// - `NotPersistent` for in-memory types
    /// - `ValidationFailed` if the entity is invalid
    /// - `Insert` or `Update` for backend failures; an update that matches
    ///   nothing is an `Update` error as well
    pub fn save(&self, entity: &mut Entity) -> CoreResult<bool> {
        let entity_type = Arc::clone(entity.entity_type());
        Self::require_persistent(&entity_type)?;
        entity_type
            .signals()
            .send(&SignalEvent::PreSave { entity: &*entity });

        let mut staged = entity.clone();
        let now = Utc::now();
        for name in entity_type.config().timestamp_refresh() {
            staged.set(name, now)?;
        }
        staged.run_validations()?;

        let backend = self.backend_for(&entity_type)?;
        let collection = self.collection_name(&entity_type);
        let storage = entity_type.config().storage();
        let mut document = self.wire().encode(&staged)?;
        document.remove(&self.config.primary_key_field);

        let created = match staged.pkey().map(str::to_string) {
            None => {
                let pkey = Self::with_collection(storage, backend.as_ref(), &collection, || {
                    backend.insert(&collection, document.clone())
                })?
                .and_then(|pkey| {
                    if pkey.is_empty() {
                        Err(BackendError::rejected("backend assigned an empty primary key"))
                    } else {
                        Ok(pkey)
                    }
                })
                .map_err(|source| DatabaseError::Insert {
                    collection: collection.clone(),
                    source,
                })?;
                debug!(collection = %collection, pkey = %pkey, "inserted document");
                staged.set_pkey(pkey)?;
                true
            }
            Some(pkey) => {
                let updated = Self::with_collection(storage, backend.as_ref(), &collection, || {
                    backend.update(&collection, &pkey, document.clone())
                })?
                .map_err(|source| DatabaseError::Update {
                    collection: collection.clone(),
                    pkey: pkey.clone(),
                    message: source.to_string(),
                    source: Some(source),
                })?;
                if !updated {
                    return Err(DatabaseError::Update {
                        collection,
                        pkey,
                        message: "no document matched".to_string(),
                        source: None,
                    }
                    .into());
                }
                debug!(collection = %collection, pkey = %pkey, "updated document");
                false
            }
        };

        *entity = staged;
        entity_type.signals().send(&SignalEvent::PostSave {
            entity: &*entity,
            created,
        });
        Ok(created)
    }

    /// Deletes a saved entity's document.
    ///
    /// # Errors
    ///
    /// Returns `NotPersistent`, `Unsaved` for entities without a key, or a
    /// `Delete` error when the backend fails or matches nothing.
    pub fn delete(&self, entity: &Entity) -> CoreResult<()> {
        let entity_type = entity.entity_type();
        Self::require_persistent(entity_type)?;
        let pkey = entity.pkey().ok_or_else(|| DatabaseError::Unsaved {
            entity_type: entity_type.name().to_string(),
        })?;
        entity_type.signals().send(&SignalEvent::PreDelete { entity });

        let backend = self.backend_for(entity_type)?;
        let collection = self.collection_name(entity_type);
        let deleted = Self::with_collection(
            entity_type.config().storage(),
            backend.as_ref(),
            &collection,
            || backend.delete(&collection, pkey),
        )?
        .map_err(|source| DatabaseError::Delete {
            collection: collection.clone(),
            pkey: pkey.to_string(),
            message: source.to_string(),
            source: Some(source),
        })?;
        if !deleted {
            return Err(DatabaseError::Delete {
                collection,
                pkey: pkey.to_string(),
                message: "no document matched".to_string(),
                source: None,
            }
            .into());
        }
        debug!(collection = %collection, pkey, "deleted document");

        entity_type.signals().send(&SignalEvent::PostDelete { entity });
        Ok(())
    }

    /// Creates today's collection of `entity_type`.
    ///
    /// Returns `true` if it did not exist before.
    ///
    /// # Errors
    ///
    /// Returns `NotPersistent`, `UnknownBackend` or `CreateCollection`.
    pub fn create_collection(&self, entity_type: &EntityType) -> CoreResult<bool> {
        Self::require_persistent(entity_type)?;
        let backend = self.backend_for(entity_type)?;
        let collection = self.collection_name(entity_type);
        let created = backend
            .create_collection(&collection)
            .map_err(|source| DatabaseError::CreateCollection {
                collection: collection.clone(),
                source,
            })?;
        info!(collection = %collection, created, "ensured collection");
        Ok(created)
    }

    /// Ensures the collection of `entity_type` exists, unless the type
    /// turned migrations off.
    ///
    /// # Errors
    ///
    /// See [`create_collection`](Self::create_collection).
    pub fn migrate(&self, entity_type: &EntityType) -> CoreResult<bool> {
        if !entity_type.config().storage().migrate {
            debug!(entity_type = %entity_type.name(), "migrations disabled");
            return Ok(false);
        }
        self.create_collection(entity_type)
    }

    /// Deletes every stored document of `entity_type`, ignoring the default
    /// fetch limit. Returns the number of deleted documents.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, or the first delete failure once every
    /// delete has finished.
    pub async fn flush(self: &Arc<Self>, entity_type: &Arc<EntityType>) -> CoreResult<usize> {
        let stored = self.fetch_limited(entity_type, &FetchOptions::new(), None)?;
        let count = stored.len();
        self.delete_many(stored).await?;
        info!(entity_type = %entity_type.name(), count, "flushed collection");
        Ok(count)
    }

    /// Deletes entities concurrently; in-memory entities are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first failure once every delete has finished.
    pub async fn delete_many(self: &Arc<Self>, entities: Vec<Entity>) -> CoreResult<()> {
        let tasks: Vec<_> = entities
            .into_iter()
            .filter(|entity| {
                let persistent = entity.entity_type().is_persistent();
                if !persistent {
                    debug!(entity = %entity, "skipping in-memory entity");
                }
                persistent
            })
            .map(|entity| {
                let adapter = Arc::clone(self);
                move || adapter.delete(&entity)
            })
            .collect();
        fan_out("delete", tasks).await.into_result().map(|_| ())
    }

    /// Saves entities concurrently.
    ///
    /// Every save runs to completion. Keys assigned by successful inserts
    /// are written back into `entities` even when another save fails.
    ///
    /// # Errors
    ///
    /// Returns the first failure once every save has finished.
    pub async fn save_many(self: &Arc<Self>, entities: &mut [Entity]) -> CoreResult<()> {
        let tasks: Vec<_> = entities
            .iter()
            .cloned()
            .map(|mut entity| {
                let adapter = Arc::clone(self);
                move || -> CoreResult<Entity> {
                    adapter.save(&mut entity)?;
                    Ok(entity)
                }
            })
            .collect();
        let outcome = fan_out("save", tasks).await;
        for (slot, saved) in entities.iter_mut().zip(outcome.values) {
            if let Some(saved) = saved {
                *slot = saved;
            }
        }
        match outcome.first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("backend", &self.backend.name())
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
