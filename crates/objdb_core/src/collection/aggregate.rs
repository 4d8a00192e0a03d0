//! Named reducers evaluated by [`EntityCollection::aggregate`].

use super::EntityCollection;
use crate::error::{CoreError, CoreResult};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A reducer from a collection to a single value.
pub type Reducer = Arc<dyn Fn(&EntityCollection) -> CoreResult<Value> + Send + Sync>;

/// A set of named reducers.
///
/// Results of all reducers are merged into one map; a later reducer with
/// the same key replaces an earlier one.
///
/// ```rust
/// use objdb_core::Aggregate;
///
/// let stats = Aggregate::new().count("books").avg("avg_pages", "pages");
/// assert_eq!(stats.keys().collect::<Vec<_>>(), ["books", "avg_pages"]);
/// ```
#[derive(Clone, Default)]
#[must_use]
pub struct Aggregate {
    reducers: Vec<(String, Reducer)>,
}

impl Aggregate {
    /// Creates an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom reducer.
    pub fn with(
        mut self,
        key: impl Into<String>,
        reducer: impl Fn(&EntityCollection) -> CoreResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.reducers.push((key.into(), Arc::new(reducer)));
        self
    }

    /// Counts the members.
    pub fn count(self, key: impl Into<String>) -> Self {
        self.with(key, |collection| Ok(Value::from(collection.len())))
    }

    /// Sums an attribute, skipping nulls.
    ///
    /// The result is an integer unless a float is involved; an empty sum is
    /// `0`.
    pub fn sum(self, key: impl Into<String>, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        self.with(key, move |collection| {
            sum(&attribute, &present(collection, &attribute)?)
        })
    }

    /// Averages an attribute, skipping nulls; `Null` when nothing is left.
    pub fn avg(self, key: impl Into<String>, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        self.with(key, move |collection| {
            let values = present(collection, &attribute)?;
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let total = sum(&attribute, &values)?
                .as_float()
                .unwrap_or_default();
            Ok(Value::Float(total / values.len() as f64))
        })
    }

    /// Smallest value of an attribute, skipping nulls.
    pub fn min(self, key: impl Into<String>, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        self.with(key, move |collection| {
            extreme(&attribute, present(collection, &attribute)?, Ordering::Less)
        })
    }

    /// Largest value of an attribute, skipping nulls.
    pub fn max(self, key: impl Into<String>, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        self.with(key, move |collection| {
            extreme(&attribute, present(collection, &attribute)?, Ordering::Greater)
        })
    }

    /// Returns the result keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.reducers.iter().map(|(key, _)| key.as_str())
    }

    pub(crate) fn evaluate_into(
        &self,
        collection: &EntityCollection,
        results: &mut BTreeMap<String, Value>,
    ) -> CoreResult<()> {
        for (key, reducer) in &self.reducers {
            results.insert(key.clone(), reducer(collection)?);
        }
        Ok(())
    }
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

fn present(collection: &EntityCollection, attribute: &str) -> CoreResult<Vec<Value>> {
    let mut values = Vec::with_capacity(collection.len());
    for entity in collection {
        let value = entity.field(attribute).ok_or_else(|| {
            CoreError::lookup(format!(
                "{} has no attribute `{attribute}`",
                entity.entity_type().name()
            ))
        })?;
        if !value.is_null() {
            values.push(value);
        }
    }
    Ok(values)
}

fn sum(attribute: &str, values: &[Value]) -> CoreResult<Value> {
    let mut int_total: i64 = 0;
    let mut float_total: Option<f64> = None;
    for value in values {
        match value {
            Value::Int(n) => {
                int_total = int_total.checked_add(*n).ok_or_else(|| {
                    CoreError::lookup(format!("sum of `{attribute}` overflows"))
                })?;
            }
            Value::Float(x) => *float_total.get_or_insert(0.0) += x,
            other => {
                return Err(CoreError::lookup(format!(
                    "cannot sum `{attribute}`: {} is not a number",
                    other.kind()
                )))
            }
        }
    }
    Ok(match float_total {
        Some(total) => Value::Float(total + int_total as f64),
        None => Value::Int(int_total),
    })
}

fn extreme(attribute: &str, values: Vec<Value>, wanted: Ordering) -> CoreResult<Value> {
    let mut values = values.into_iter();
    let Some(mut best) = values.next() else {
        return Ok(Value::Null);
    };
    for value in values {
        let order = value.compare(&best).ok_or_else(|| {
            CoreError::lookup(format!(
                "cannot compare `{attribute}` values of kinds {} and {}",
                value.kind(),
                best.kind()
            ))
        })?;
        if order == wanted {
            best = value;
        }
    }
    Ok(best)
}
