//! The typed entity collection.

use super::aggregate::Aggregate;
use super::lookup::{lookups, matches_all, Lookup};
use super::query::FetchOptions;
use crate::entity::{Entity, EntityType};
use crate::error::{CoreError, CoreResult, DatabaseError};
use crate::persistence::PersistenceAdapter;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Index, Sub};
use std::sync::Arc;

/// An ordered list of entities of exactly one type.
///
/// Every mutation checks that the entity's type is the collection's type
/// (subtypes are rejected). A collection may carry a persistence adapter;
/// [`all`](Self::all) is the only method that reads through it. Every
/// query method works on the current members and returns a new, detached
/// collection.
///
/// # Example
///
/// ```rust
/// use objdb_core::{Configuration, EntityCollection, EntityType, Registry, Value, ValueType};
///
/// let registry = Registry::new();
/// let person = registry
///     .register(
///         EntityType::in_memory("Person").config(
///             Configuration::new()
///                 .with_attribute("name", [ValueType::Text])
///                 .with_attribute("age", [ValueType::Int]),
///         ),
///     )
///     .unwrap();
///
/// let mut people = EntityCollection::new(person.clone());
/// for (name, age) in [("Ada", 36), ("Alan", 41), ("Grace", 85)] {
///     people.push(person.create([("name", Value::from(name)), ("age", Value::from(age))]).unwrap()).unwrap();
/// }
///
/// let seniors = people.filter([("age__gte", 40)]).unwrap();
/// assert_eq!(seniors.len(), 2);
/// ```
#[derive(Clone)]
pub struct EntityCollection {
    entity_type: Arc<EntityType>,
    adapter: Option<Arc<PersistenceAdapter>>,
    entities: Vec<Entity>,
}

impl EntityCollection {
    /// Creates an empty, detached collection.
    #[must_use]
    pub fn new(entity_type: Arc<EntityType>) -> Self {
        Self {
            entity_type,
            adapter: None,
            entities: Vec::new(),
        }
    }

    /// Creates a detached collection holding `entities`.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` if any entity has another type.
    pub fn from_entities(
        entity_type: Arc<EntityType>,
        entities: impl IntoIterator<Item = Entity>,
    ) -> CoreResult<Self> {
        let mut collection = Self::new(entity_type);
        collection.extend(entities)?;
        Ok(collection)
    }

    /// Attaches a persistence adapter.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<PersistenceAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Returns the member type.
    #[must_use]
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.entity_type
    }

    /// Returns the attached adapter.
    #[must_use]
    pub fn adapter(&self) -> Option<&Arc<PersistenceAdapter>> {
        self.adapter.as_ref()
    }

    /// Returns `true` if no adapter is attached.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.adapter.is_none()
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates over the members.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// Returns the members as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns the member at `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    /// Consumes the collection, returning its members.
    #[must_use]
    pub fn into_vec(self) -> Vec<Entity> {
        self.entities
    }

    // ---- typed mutation ----

    fn check(&self, entity: &Entity) -> CoreResult<()> {
        if Arc::ptr_eq(entity.entity_type(), &self.entity_type) {
            Ok(())
        } else {
            Err(CoreError::wrong_type(
                self.entity_type.name(),
                entity.entity_type().name(),
            ))
        }
    }

    fn check_same_type(&self, other: &Self) -> CoreResult<()> {
        if Arc::ptr_eq(&other.entity_type, &self.entity_type) {
            Ok(())
        } else {
            Err(CoreError::wrong_type(
                self.entity_type.name(),
                other.entity_type.name(),
            ))
        }
    }

    /// Appends an entity.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` if the entity has another type.
    pub fn push(&mut self, entity: Entity) -> CoreResult<()> {
        self.check(&entity)?;
        self.entities.push(entity);
        Ok(())
    }

    /// Appends every entity, or none if one has the wrong type.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` if any entity has another type.
    pub fn extend(&mut self, entities: impl IntoIterator<Item = Entity>) -> CoreResult<()> {
        let entities: Vec<Entity> = entities.into_iter().collect();
        for entity in &entities {
            self.check(entity)?;
        }
        self.entities.extend(entities);
        Ok(())
    }

    pub(crate) fn extend_unchecked(&mut self, entities: impl IntoIterator<Item = Entity>) {
        self.entities.extend(entities);
    }

    /// Inserts an entity at `index`.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` for another type and `InvalidArgument` if
    /// `index` is past the end.
    pub fn insert(&mut self, index: usize, entity: Entity) -> CoreResult<()> {
        self.check(&entity)?;
        if index > self.entities.len() {
            return Err(CoreError::invalid_argument(format!(
                "index {index} is out of range for a collection of {}",
                self.entities.len()
            )));
        }
        self.entities.insert(index, entity);
        Ok(())
    }

    /// Replaces the member at `index`, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` for another type and `InvalidArgument` if
    /// `index` is out of range.
    pub fn set(&mut self, index: usize, entity: Entity) -> CoreResult<Entity> {
        self.check(&entity)?;
        let slot = self.entities.get_mut(index).ok_or_else(|| {
            CoreError::invalid_argument(format!("index {index} is out of range"))
        })?;
        Ok(std::mem::replace(slot, entity))
    }

    /// Returns a detached collection with the members of both.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` if `other` holds another type.
    pub fn concat(&self, other: &Self) -> CoreResult<Self> {
        self.check_same_type(other)?;
        let mut joined = self.detached_copy();
        joined.entities.extend(other.entities.iter().cloned());
        Ok(joined)
    }

    /// Removes the first occurrence of `entity`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if it is not a member.
    pub fn remove(&mut self, entity: &Entity) -> CoreResult<()> {
        let index = self.index_of(entity)?;
        self.entities.remove(index);
        Ok(())
    }

    /// Removes the first member matching the lookups and returns it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` without lookups, or a lookup error.
    pub fn remove_matching<K, V>(
        &mut self,
        lookups: impl IntoIterator<Item = (K, V)>,
    ) -> CoreResult<Option<Entity>>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let lookups = required_lookups(lookups)?;
        for index in 0..self.entities.len() {
            if matches_all(&self.entities[index], &lookups)? {
                return Ok(Some(self.entities.remove(index)));
            }
        }
        Ok(None)
    }

    /// Removes and returns the last member.
    pub fn pop(&mut self) -> Option<Entity> {
        self.entities.pop()
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Reverses the members in place.
    pub fn reverse(&mut self) {
        self.entities.reverse();
    }

    /// Returns the position of the first occurrence of `entity`.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` for another type and `InvalidArgument` if
    /// it is not a member.
    pub fn index_of(&self, entity: &Entity) -> CoreResult<usize> {
        self.check(entity)?;
        self.entities
            .iter()
            .position(|member| member == entity)
            .ok_or_else(|| CoreError::invalid_argument(format!("{entity} is not in the collection")))
    }

    /// Returns the position of the first member matching the lookups.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if nothing matches or no lookup is given.
    pub fn index_matching<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<usize>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let lookups = required_lookups(lookups)?;
        for (index, entity) in self.entities.iter().enumerate() {
            if matches_all(entity, &lookups)? {
                return Ok(index);
            }
        }
        Err(CoreError::invalid_argument(format!(
            "No {} found with attributes: {}",
            self.entity_type.name(),
            describe(&lookups)
        )))
    }

    // ---- fetching ----

    fn detached_copy(&self) -> Self {
        Self {
            entity_type: Arc::clone(&self.entity_type),
            adapter: None,
            entities: self.entities.clone(),
        }
    }

    fn fetch(&self, options: &FetchOptions) -> CoreResult<Vec<Entity>> {
        if let Some(cache) = self.entity_type.cache() {
            let cached = cache.lock().all()?.into_vec();
            return options.apply_locally(cached);
        }
        match &self.adapter {
            Some(adapter) => adapter.fetch(&self.entity_type, options),
            None => Ok(Vec::new()),
        }
    }

    /// Returns the members merged with everything the source holds.
    ///
    /// The source is the attached adapter for persistent types and the
    /// type's cache for in-memory types; a detached persistent collection
    /// has no source. Duplicates are dropped and the declared ordering is
    /// applied. The result is detached.
    ///
    /// # Errors
    ///
    /// Returns a database error if the fetch fails, a cache error if the
    /// cache is corrupt, or a lookup error if the ordering cannot be
    /// applied.
    pub fn all(&self, options: &FetchOptions) -> CoreResult<Self> {
        let fetched = self.fetch(options)?;
        let mut merged = self.none();
        merged.entities = unique(self.entities.iter().chain(&fetched));

        let ordering = self.entity_type.config().ordering();
        if ordering.is_empty() {
            Ok(merged)
        } else {
            merged.order_by(ordering)
        }
    }

    /// Returns an empty, detached collection of the same type.
    #[must_use]
    pub fn none(&self) -> Self {
        Self::new(Arc::clone(&self.entity_type))
    }

    /// Returns a detached collection with the members repeated `times` times.
    #[must_use]
    pub fn repeat(&self, times: usize) -> Self {
        let mut repeated = self.none();
        for _ in 0..times {
            repeated.entities.extend(self.entities.iter().cloned());
        }
        repeated
    }

    // ---- lookups ----

    fn select(&self, lookups: &[Lookup], keep_matches: bool) -> CoreResult<Self> {
        let mut selected = self.none();
        for entity in &self.entities {
            if matches_all(entity, lookups)? == keep_matches {
                selected.entities.push(entity.clone());
            }
        }
        Ok(selected)
    }

    /// Returns the members matching every lookup.
    ///
    /// Without lookups every member is returned.
    ///
    /// # Errors
    ///
    /// Returns a lookup error for unknown attributes or operators and for
    /// unsupported comparisons.
    pub fn filter<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.select(&self::lookups(lookups)?, true)
    }

    /// Returns the members not matching the lookups.
    ///
    /// `filter` and `exclude` with the same lookups partition the members.
    ///
    /// # Errors
    ///
    /// Same as [`filter`](Self::filter).
    pub fn exclude<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let lookups = self::lookups(lookups)?;
        if lookups.is_empty() {
            return Ok(self.none());
        }
        self.select(&lookups, false)
    }

    /// Returns the single member matching the lookups.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` without lookups
    /// - `DoesNotExist` if nothing matches
    /// - `MultipleObjectsReturned` if more than one member matches
    pub fn get<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<Entity>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let lookups = required_lookups(lookups)?;
        let mut found = self.select(&lookups, true)?.entities.into_iter();
        match (found.next(), found.len()) {
            (None, _) => Err(CoreError::DoesNotExist {
                entity_type: self.entity_type.name().to_string(),
                message: format!(
                    "No {} found with attributes: {}",
                    self.entity_type.name(),
                    describe(&lookups)
                ),
            }),
            (Some(entity), 0) => Ok(entity),
            (Some(_), rest) => Err(CoreError::MultipleObjectsReturned {
                entity_type: self.entity_type.name().to_string(),
                count: rest + 1,
            }),
        }
    }

    /// Returns `true` if any member matches the lookups.
    ///
    /// # Errors
    ///
    /// Same as [`filter`](Self::filter).
    pub fn exists<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<bool>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Ok(!self.filter(lookups)?.is_empty())
    }

    /// Returns the number of members matching the lookups.
    ///
    /// # Errors
    ///
    /// Same as [`filter`](Self::filter).
    pub fn count_matching<K, V>(&self, lookups: impl IntoIterator<Item = (K, V)>) -> CoreResult<usize>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Ok(self.filter(lookups)?.len())
    }

    /// Returns the number of members.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// Returns how many members equal `entity`.
    #[must_use]
    pub fn occurrences(&self, entity: &Entity) -> usize {
        self.entities.iter().filter(|member| *member == entity).count()
    }

    /// Returns `true` if `entity` is a member.
    #[must_use]
    pub fn contains(&self, entity: &Entity) -> bool {
        self.entities.contains(entity)
    }

    /// Returns the first member.
    #[must_use]
    pub fn first(&self) -> Option<&Entity> {
        self.entities.first()
    }

    /// Returns the last member.
    #[must_use]
    pub fn last(&self) -> Option<&Entity> {
        self.entities.last()
    }

    // ---- ordering ----

    /// Returns the members sorted by the given attributes.
    ///
    /// Each attribute is applied as its own stable sort over the whole
    /// list, in the order given, so the **last** attribute ends up as the
    /// primary sort key. Prefix a name with `-` to sort descending.
    ///
    /// # Errors
    ///
    /// Returns a lookup error for an unknown attribute or when two values
    /// cannot be ordered (including `Null`).
    pub fn order_by<S: AsRef<str>>(&self, attributes: impl IntoIterator<Item = S>) -> CoreResult<Self> {
        let mut ordered = self.detached_copy();
        for attribute in attributes {
            let attribute = attribute.as_ref();
            match attribute.strip_prefix('-') {
                Some(name) => ordered.sort_by_attribute(name, true)?,
                None => ordered.sort_by_attribute(attribute, false)?,
            }
        }
        Ok(ordered)
    }

    fn sort_by_attribute(&mut self, name: &str, descending: bool) -> CoreResult<()> {
        let keys = self
            .entities
            .iter()
            .map(|entity| {
                entity.field(name).ok_or_else(|| {
                    CoreError::lookup(format!(
                        "cannot order {} by unknown attribute `{name}`",
                        self.entity_type.name()
                    ))
                })
            })
            .collect::<CoreResult<Vec<Value>>>()?;

        let mut keyed: Vec<(Value, Entity)> = keys.into_iter().zip(self.entities.drain(..)).collect();
        let mut failure = None;
        keyed.sort_by(|(a, _), (b, _)| {
            let (a, b) = if descending { (b, a) } else { (a, b) };
            a.compare(b).unwrap_or_else(|| {
                failure.get_or_insert_with(|| {
                    CoreError::lookup(format!(
                        "cannot order by `{name}`: {} and {} are not comparable",
                        a.kind(),
                        b.kind()
                    ))
                });
                Ordering::Equal
            })
        });
        self.entities = keyed.into_iter().map(|(_, entity)| entity).collect();
        failure.map_or(Ok(()), Err)
    }

    fn edge(&self, attributes: &[&str], last: bool) -> CoreResult<Option<Entity>> {
        let declared;
        let attributes: Vec<&str> = if attributes.is_empty() {
            declared = self.entity_type.config().ordering();
            declared.iter().map(String::as_str).collect()
        } else {
            attributes.to_vec()
        };
        let ascending = attributes
            .iter()
            .map(|attribute| attribute.strip_prefix('-').unwrap_or(attribute));
        let ordered = self.order_by(ascending)?;
        Ok(if last { ordered.last() } else { ordered.first() }.cloned())
    }

    /// Returns the member with the smallest values of `attributes`.
    ///
    /// Without attributes the declared ordering is used; `-` prefixes are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Same as [`order_by`](Self::order_by).
    pub fn earliest(&self, attributes: &[&str]) -> CoreResult<Option<Entity>> {
        self.edge(attributes, false)
    }

    /// Returns the member with the largest values of `attributes`.
    ///
    /// # Errors
    ///
    /// Same as [`order_by`](Self::order_by).
    pub fn latest(&self, attributes: &[&str]) -> CoreResult<Option<Entity>> {
        self.edge(attributes, true)
    }

    // ---- set algebra ----

    /// Members of either collection, without duplicates.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` if `other` holds another type.
    pub fn union(&self, other: &Self) -> CoreResult<Self> {
        self.check_same_type(other)?;
        let mut result = self.none();
        result.entities = unique(self.entities.iter().chain(&other.entities));
        Ok(result)
    }

    /// Members present in both collections.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` if `other` holds another type.
    pub fn intersect(&self, other: &Self) -> CoreResult<Self> {
        self.check_same_type(other)?;
        let theirs: HashSet<&Entity> = other.entities.iter().collect();
        let mut result = self.none();
        result.entities = unique(self.entities.iter().filter(|e| theirs.contains(e)));
        Ok(result)
    }

    /// Members of this collection absent from `other`.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` if `other` holds another type.
    pub fn difference(&self, other: &Self) -> CoreResult<Self> {
        self.check_same_type(other)?;
        let theirs: HashSet<&Entity> = other.entities.iter().collect();
        let mut result = self.none();
        result.entities = unique(self.entities.iter().filter(|e| !theirs.contains(e)));
        Ok(result)
    }

    /// Members of exactly one of the collections.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` if `other` holds another type.
    pub fn symmetric_difference(&self, other: &Self) -> CoreResult<Self> {
        self.check_same_type(other)?;
        let ours: HashSet<&Entity> = self.entities.iter().collect();
        let theirs: HashSet<&Entity> = other.entities.iter().collect();
        let mut result = self.none();
        result.entities = unique(
            self.entities
                .iter()
                .filter(|e| !theirs.contains(e))
                .chain(other.entities.iter().filter(|e| !ours.contains(e))),
        );
        Ok(result)
    }

    /// Members without duplicates, in order of first appearance.
    #[must_use]
    pub fn distinct(&self) -> Self {
        let mut result = self.none();
        result.entities = unique(self.entities.iter());
        result
    }

    // ---- projections ----

    /// Evaluates an aggregate over the members.
    ///
    /// # Errors
    ///
    /// Returns the first reducer error.
    pub fn aggregate(&self, aggregate: Aggregate) -> CoreResult<BTreeMap<String, Value>> {
        let mut results = BTreeMap::new();
        aggregate.evaluate_into(self, &mut results)?;
        Ok(results)
    }

    fn projection<'a>(&'a self, attributes: &'a [&'a str]) -> Vec<&'a str> {
        if attributes.is_empty() {
            self.entity_type
                .config()
                .attribute_names()
                .chain(std::iter::once("pkey"))
                .collect()
        } else {
            attributes.to_vec()
        }
    }

    fn project(entity: &Entity, attribute: &str) -> CoreResult<Value> {
        entity.field(attribute).ok_or_else(|| {
            CoreError::lookup(format!(
                "{} has no attribute `{attribute}`",
                entity.entity_type().name()
            ))
        })
    }

    /// Returns one map per member holding `attributes` (every attribute
    /// and `pkey` when empty).
    ///
    /// # Errors
    ///
    /// Returns a lookup error for unknown attributes.
    pub fn values(&self, attributes: &[&str]) -> CoreResult<Vec<BTreeMap<String, Value>>> {
        let attributes = self.projection(attributes);
        self.entities
            .iter()
            .map(|entity| {
                attributes
                    .iter()
                    .map(|name| Ok((name.to_string(), Self::project(entity, name)?)))
                    .collect()
            })
            .collect()
    }

    /// Returns one row of values per member, in the order of `attributes`.
    ///
    /// # Errors
    ///
    /// Returns a lookup error for unknown attributes.
    pub fn values_list(&self, attributes: &[&str]) -> CoreResult<Vec<Vec<Value>>> {
        let attributes = self.projection(attributes);
        self.entities
            .iter()
            .map(|entity| {
                attributes
                    .iter()
                    .map(|name| Self::project(entity, name))
                    .collect()
            })
            .collect()
    }

    /// Returns the primary keys of the members.
    #[must_use]
    pub fn pkeys(&self) -> Vec<Option<String>> {
        self.entities
            .iter()
            .map(|entity| entity.pkey().map(str::to_string))
            .collect()
    }

    // ---- persistence ----

    fn require_adapter(&self) -> CoreResult<&Arc<PersistenceAdapter>> {
        self.adapter.as_ref().ok_or_else(|| {
            DatabaseError::NoBackend {
                entity_type: self.entity_type.name().to_string(),
            }
            .into()
        })
    }

    /// Deletes every member of [`all`](Self::all) from the backend.
    ///
    /// Deletes run concurrently; all of them complete before the first
    /// failure is returned. In-memory members are skipped.
    ///
    /// # Errors
    ///
    /// Returns `NoBackend` for detached collections, or the first delete
    /// failure.
    pub async fn delete_all(&self) -> CoreResult<()> {
        let adapter = Arc::clone(self.require_adapter()?);
        let members = self.all(&FetchOptions::new())?;
        adapter.delete_many(members.into_vec()).await
    }

    /// Deletes the given entities through this collection's adapter.
    ///
    /// # Errors
    ///
    /// Returns `WrongEntityType` before deleting anything if an entity has
    /// another type, `NoBackend` for detached collections, or the first
    /// delete failure.
    pub async fn bulk_delete(&self, entities: impl IntoIterator<Item = Entity>) -> CoreResult<()> {
        let mut batch = self.none();
        batch.extend(entities)?;
        let adapter = Arc::clone(self.require_adapter()?);
        adapter.delete_many(batch.into_vec()).await
    }
}

fn unique<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Vec<Entity> {
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .filter(|entity| seen.insert(*entity))
        .cloned()
        .collect()
}

fn required_lookups<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> CoreResult<Vec<Lookup>>
where
    K: Into<String>,
    V: Into<Value>,
{
    let lookups = lookups(pairs)?;
    if lookups.is_empty() {
        return Err(CoreError::invalid_argument("No lookups provided."));
    }
    Ok(lookups)
}

fn describe(lookups: &[Lookup]) -> String {
    lookups
        .iter()
        .map(|lookup| format!("`{}={}`", lookup.key(), lookup.value()))
        .collect::<Vec<_>>()
        .join(" ")
}

impl PartialEq for EntityCollection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entity_type, &other.entity_type) && self.entities == other.entities
    }
}

impl fmt::Debug for EntityCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCollection")
            .field("type", &self.entity_type.name())
            .field("attached", &self.adapter.is_some())
            .field("entities", &self.entities)
            .finish()
    }
}

impl Index<usize> for EntityCollection {
    type Output = Entity;

    fn index(&self, index: usize) -> &Entity {
        &self.entities[index]
    }
}

impl IntoIterator for EntityCollection {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntityCollection {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

impl BitOr for &EntityCollection {
    type Output = CoreResult<EntityCollection>;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitAnd for &EntityCollection {
    type Output = CoreResult<EntityCollection>;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersect(rhs)
    }
}

impl Sub for &EntityCollection {
    type Output = CoreResult<EntityCollection>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.difference(rhs)
    }
}

impl BitXor for &EntityCollection {
    type Output = CoreResult<EntityCollection>;

    fn bitxor(self, rhs: Self) -> Self::Output {
        self.symmetric_difference(rhs)
    }
}
