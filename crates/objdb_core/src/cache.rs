//! Bounded per-type entity cache.
//!
//! In-memory entity types keep their live instances in an [`EntityCache`]:
//! an insertion-ordered register of `pkey -> (timestamp, entity)` records
//! with a key index beside it. Every access that reads the register first
//! re-checks its invariants in one pass and fails with
//! [`CacheError::Corrupt`] instead of repairing anything.

use crate::collection::EntityCollection;
use crate::entity::{Entity, EntityType};
use crate::error::{CacheError, CoreResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Capacity policy of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    /// Maximum number of records; `None` is unbounded.
    pub max_size: Option<usize>,
    /// Wipe the cache instead of failing when an insert finds it full.
    pub clear_when_full: bool,
}

impl CachePolicy {
    /// Creates an unbounded policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of records.
    #[must_use]
    pub const fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Sets whether a full cache is wiped on insert.
    #[must_use]
    pub const fn clear_when_full(mut self, value: bool) -> Self {
        self.clear_when_full = value;
        self
    }
}

/// One cached entity.
#[derive(Debug, Clone)]
pub struct CacheRecord {
    /// Key the record is stored under.
    pub pkey: String,
    /// Time of the last insert or update.
    pub stored_at: DateTime<Utc>,
    /// The cached entity.
    pub entity: Entity,
}

/// A bounded, type-checked register of entities.
#[derive(Debug)]
pub struct EntityCache {
    entity_type: Weak<EntityType>,
    type_name: String,
    locator: String,
    policy: CachePolicy,
    records: Vec<CacheRecord>,
    index: HashMap<String, usize>,
}

impl EntityCache {
    /// Creates an empty cache for entities of `entity_type`.
    #[must_use]
    pub fn new(entity_type: &Arc<EntityType>, policy: CachePolicy) -> Self {
        Self::bound(
            Arc::downgrade(entity_type),
            entity_type.name().to_string(),
            entity_type.locator().to_string(),
            policy,
        )
    }

    pub(crate) fn bound(
        entity_type: Weak<EntityType>,
        type_name: String,
        locator: String,
        policy: CachePolicy,
    ) -> Self {
        Self {
            entity_type,
            type_name,
            locator,
            policy,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns the capacity policy.
    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Returns the locator of the cached type.
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Returns the number of records without validating them.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the cache holds no record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `true` if an insert would find the cache full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.policy
            .max_size
            .is_some_and(|max| self.records.len() >= max)
    }

    fn owns(&self, entity: &Entity) -> bool {
        std::ptr::eq(Arc::as_ptr(entity.entity_type()), self.entity_type.as_ptr())
    }

    fn corrupt(&self, message: impl Into<String>) -> CacheError {
        CacheError::Corrupt {
            entity_type: self.type_name.clone(),
            message: message.into(),
        }
    }

    /// Returns the validated live register.
    fn register(&self) -> Result<&[CacheRecord], CacheError> {
        if let Some(max) = self.policy.max_size {
            if self.records.len() > max {
                return Err(self.corrupt(format!(
                    "holds {} records but the maximum is {max}",
                    self.records.len()
                )));
            }
        }
        if self.index.len() != self.records.len() {
            return Err(self.corrupt(format!(
                "indexes {} keys for {} records",
                self.index.len(),
                self.records.len()
            )));
        }
        for (i, record) in self.records.iter().enumerate() {
            if !self.owns(&record.entity) {
                return Err(self.corrupt(format!(
                    "record {} holds a {} entity",
                    record.pkey,
                    record.entity.entity_type().name()
                )));
            }
            if record.entity.pkey() != Some(record.pkey.as_str()) {
                return Err(self.corrupt(format!(
                    "record {} holds an entity keyed {:?}",
                    record.pkey,
                    record.entity.pkey()
                )));
            }
            if self.index.get(&record.pkey) != Some(&i) {
                return Err(self.corrupt(format!("key {} appears twice", record.pkey)));
            }
        }
        Ok(&self.records)
    }

    fn key_of<'e>(&self, entity: &'e Entity) -> Result<&'e str, CacheError> {
        if !self.owns(entity) {
            return Err(CacheError::WrongType {
                expected: self.type_name.clone(),
                found: entity.entity_type().name().to_string(),
            });
        }
        entity.pkey().ok_or_else(|| CacheError::MissingKey {
            entity_type: self.type_name.clone(),
        })
    }

    fn position(&self, pkey: &str) -> Result<usize, CacheError> {
        self.register()?;
        self.index
            .get(pkey)
            .copied()
            .ok_or_else(|| CacheError::NotFound {
                pkey: pkey.to_string(),
            })
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.pkey.clone(), i))
            .collect();
    }

    /// Stores an entity under its primary key and returns the timestamp.
    ///
    /// # Errors
    ///
    /// - `Full` when at capacity and `clear_when_full` is off
    /// - `WrongType` or `MissingKey` for unsuitable entities
    /// - `Corrupt` if the register is invalid
    pub fn insert(&mut self, entity: &Entity) -> CoreResult<DateTime<Utc>> {
        let pkey = self.key_of(entity)?.to_string();
        let len = self.register()?.len();
        if self.policy.max_size.is_some_and(|max| len >= max) {
            if !self.policy.clear_when_full {
                return Err(CacheError::Full.into());
            }
            debug!(entity_type = %self.type_name, evicted = len, "cache full, clearing");
            self.clear();
        }

        let record = CacheRecord {
            pkey: pkey.clone(),
            stored_at: Utc::now(),
            entity: entity.clone(),
        };
        let stored_at = record.stored_at;
        match self.index.get(&pkey).copied() {
            Some(i) => self.records[i] = record,
            None => {
                self.index.insert(pkey, self.records.len());
                self.records.push(record);
            }
        }
        Ok(stored_at)
    }

    /// Replaces the record of an already cached entity.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is not cached.
    pub fn update(&mut self, entity: &Entity) -> CoreResult<DateTime<Utc>> {
        let pkey = self.key_of(entity)?;
        let index = self.position(pkey)?;
        let stored_at = Utc::now();
        self.records[index] = CacheRecord {
            pkey: pkey.to_string(),
            stored_at,
            entity: entity.clone(),
        };
        Ok(stored_at)
    }

    /// Removes an entity's record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is not cached.
    pub fn remove(&mut self, entity: &Entity) -> CoreResult<CacheRecord> {
        let pkey = self.key_of(entity)?;
        let index = self.position(pkey)?;
        let record = self.records.remove(index);
        self.reindex();
        Ok(record)
    }

    /// Returns the entity cached under `pkey`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is not cached.
    pub fn get(&self, pkey: &str) -> CoreResult<Entity> {
        let index = self.position(pkey)?;
        Ok(self.records[index].entity.clone())
    }

    /// Returns a copy of every record.
    ///
    /// # Errors
    ///
    /// Returns `Corrupt` if the register is invalid.
    pub fn records(&self) -> CoreResult<Vec<CacheRecord>> {
        Ok(self.register()?.to_vec())
    }

    /// Returns the cached entities as a detached collection.
    ///
    /// # Errors
    ///
    /// Returns `Corrupt` if the register is invalid or the type is gone.
    pub fn all(&self) -> CoreResult<EntityCollection> {
        let records = self.register()?;
        let entity_type = self
            .entity_type
            .upgrade()
            .ok_or_else(|| self.corrupt("entity type no longer exists"))?;
        let mut collection = EntityCollection::new(entity_type);
        collection.extend_unchecked(records.iter().map(|record| record.entity.clone()));
        Ok(collection)
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    /// Replaces the register without any checks.
    ///
    /// Invalid records surface as `Corrupt` on the next read.
    pub fn restore(&mut self, records: impl IntoIterator<Item = CacheRecord>) {
        self.records = records.into_iter().collect();
        self.reindex();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::{Configuration, Registry, ValueType};

    fn registry_with(policy: CachePolicy) -> (Registry, Arc<EntityType>) {
        let registry = Registry::new();
        let session = registry
            .register(
                EntityType::in_memory("Session")
                    .config(Configuration::new().with_attribute("user", [ValueType::Text]))
                    .cache_policy(policy),
            )
            .unwrap();
        (registry, session)
    }

    #[test]
    fn third_insert_into_full_cache_fails() {
        let (_registry, session) = registry_with(CachePolicy::new().max_size(2));
        session.create([("user", "a")]).unwrap();
        session.create([("user", "b")]).unwrap();

        let err = session.create([("user", "c")]).unwrap_err();
        assert!(matches!(err, CoreError::Cache(CacheError::Full)));
        assert_eq!(err.to_string(), "Cache is full");
        assert_eq!(session.cache().unwrap().lock().len(), 2);
    }

    #[test]
    fn clear_when_full_keeps_only_the_newest() {
        let (_registry, session) =
            registry_with(CachePolicy::new().max_size(2).clear_when_full(true));
        session.create([("user", "a")]).unwrap();
        session.create([("user", "b")]).unwrap();
        let third = session.create([("user", "c")]).unwrap();

        let cache = session.cache().unwrap().lock();
        let all = cache.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], third);
    }

    #[test]
    fn update_and_remove_require_existing_key() {
        let (_registry, session) = registry_with(CachePolicy::new());
        let entity = session.create([("user", "a")]).unwrap();
        let mut cache = session.cache().unwrap().lock();

        let before = cache.records().unwrap()[0].stored_at;
        let after = cache.update(&entity).unwrap();
        assert!(after >= before);

        cache.remove(&entity).unwrap();
        assert!(matches!(
            cache.update(&entity),
            Err(CoreError::Cache(CacheError::NotFound { .. }))
        ));
        assert!(matches!(
            cache.remove(&entity),
            Err(CoreError::Cache(CacheError::NotFound { .. }))
        ));
    }

    #[test]
    fn standalone_cache_rejects_other_types() {
        let (registry, session) = registry_with(CachePolicy::new());
        let token = registry
            .register(
                EntityType::in_memory("Token")
                    .config(Configuration::new().with_attribute("value", [ValueType::Text])),
            )
            .unwrap();
        let mut cache = EntityCache::new(&session, CachePolicy::new());

        let foreign = token.create([("value", "x")]).unwrap();
        assert!(matches!(
            cache.insert(&foreign),
            Err(CoreError::Cache(CacheError::WrongType { .. }))
        ));
    }

    #[test]
    fn restored_garbage_is_reported_as_corrupt() {
        let (_registry, session) = registry_with(CachePolicy::new().max_size(1));
        let a = session.create([("user", "a")]).unwrap();
        let mut cache = session.cache().unwrap().lock();

        cache.restore(vec![CacheRecord {
            pkey: "wrong".into(),
            stored_at: Utc::now(),
            entity: a.clone(),
        }]);
        let err = cache.get("wrong").unwrap_err();
        assert!(matches!(err, CoreError::Cache(CacheError::Corrupt { .. })));
        assert!(err.to_string().starts_with("Cache for Session is corrupt"));

        let record = |entity: &Entity| CacheRecord {
            pkey: entity.pkey().unwrap().to_string(),
            stored_at: Utc::now(),
            entity: entity.clone(),
        };
        cache.restore(vec![record(&a), record(&a)]);
        assert!(cache.all().is_err());

        cache.restore(vec![record(&a)]);
        assert_eq!(cache.get(a.pkey().unwrap()).unwrap(), a);
    }

    #[test]
    fn large_caches_keep_their_index_in_step() {
        let (_registry, session) = registry_with(CachePolicy::new());
        let sessions: Vec<Entity> = (0..2_000)
            .map(|i| session.create([("user", format!("user-{i}"))]).unwrap())
            .collect();
        let mut cache = session.cache().unwrap().lock();
        assert_eq!(cache.len(), 2_000);

        cache.remove(&sessions[0]).unwrap();
        cache.remove(&sessions[1_000]).unwrap();
        let last = sessions.last().unwrap();
        assert_eq!(cache.get(last.pkey().unwrap()).unwrap(), *last);
        cache.update(&sessions[1]).unwrap();

        let all = cache.all().unwrap();
        assert_eq!(all.len(), 1_998);
        assert_eq!(all[0], sessions[1]);
        assert_eq!(all[999], sessions[1_001]);
    }

    #[test]
    fn entities_without_key_cannot_be_cached() {
        let registry = Registry::new();
        let doc = registry
            .register(
                EntityType::persistent("Doc").config(
                    Configuration::persistent().with_attribute("body", [ValueType::Text]),
                ),
            )
            .unwrap();
        let mut cache = EntityCache::new(&doc, CachePolicy::new());
        let unsaved = doc.create([("body", "x")]).unwrap();
        assert!(matches!(
            cache.insert(&unsaved),
            Err(CoreError::Cache(CacheError::MissingKey { .. }))
        ));
    }
}
