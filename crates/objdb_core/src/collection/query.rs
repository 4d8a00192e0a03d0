//! Options passed through `all()` to the backend fetch.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::value::Value;
use std::collections::BTreeMap;

/// Backend-side restrictions of a fetch.
///
/// Filters are equality matches on stored attributes; richer predicates
/// belong in [`filter`](super::EntityCollection::filter) after the fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// Attribute/value equality filters.
    pub filters: BTreeMap<String, Value>,
    /// Maximum number of documents.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl FetchOptions {
    /// Creates options that fetch everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn filter(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(attribute.into(), value.into());
        self
    }

    /// Sets the maximum number of documents.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Applies the filters, then offset and limit, to entities already in
    /// memory.
    pub(crate) fn apply_locally(&self, entities: Vec<Entity>) -> CoreResult<Vec<Entity>> {
        let mut kept = Vec::with_capacity(entities.len());
        for entity in entities {
            if self.matches(&entity)? {
                kept.push(entity);
            }
        }
        let skipped = kept.into_iter().skip(self.offset.unwrap_or(0));
        Ok(match self.limit {
            Some(limit) => skipped.take(limit).collect(),
            None => skipped.collect(),
        })
    }

    pub(crate) fn matches(&self, entity: &Entity) -> CoreResult<bool> {
        for (attribute, expected) in &self.filters {
            let value = entity.field(attribute).ok_or_else(|| {
                CoreError::lookup(format!(
                    "{} has no attribute `{attribute}`",
                    entity.entity_type().name()
                ))
            })?;
            if value != *expected {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
