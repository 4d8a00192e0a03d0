//! Lookup expressions used by `filter`, `exclude` and `get`.
//!
//! A lookup key is either a bare attribute name (equality) or a path
//! `attr__nested__op`. Segments are resolved against the current value
//! while they name something on it: a declared attribute or the `pkey` of
//! an entity, or a key of a map. The first segment that does not resolve
//! is the operator and must be the last one.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::value::Value;
use std::cmp::Ordering;

/// Separator between lookup segments.
pub const LOOKUP_SEPARATOR: &str = "__";

/// A comparison applied at the end of a lookup path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equality.
    Exact,
    /// Case-insensitive textual equality.
    IExact,
    /// Substring, or membership when the value is a list.
    Contains,
    /// Case-insensitive `Contains`.
    IContains,
    /// Textual prefix; the operand must be text.
    StartsWith,
    /// Case-insensitive prefix.
    IStartsWith,
    /// Textual suffix.
    EndsWith,
    /// Case-insensitive suffix.
    IEndsWith,
    /// Membership of the value in the operand.
    In,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Inclusive `[low, high]` range.
    Range,
}

impl Operator {
    /// Parses an operator name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "exact" => Self::Exact,
            "iexact" => Self::IExact,
            "contains" => Self::Contains,
            "icontains" => Self::IContains,
            "startswith" => Self::StartsWith,
            "istartswith" => Self::IStartsWith,
            "endswith" => Self::EndsWith,
            "iendswith" => Self::IEndsWith,
            "in" => Self::In,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "range" => Self::Range,
            _ => return None,
        })
    }

    /// Returns the operator name as written in lookup keys.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IExact => "iexact",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::StartsWith => "startswith",
            Self::IStartsWith => "istartswith",
            Self::EndsWith => "endswith",
            Self::IEndsWith => "iendswith",
            Self::In => "in",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Range => "range",
        }
    }

    /// Evaluates `lhs <op> rhs`.
    ///
    /// # Errors
    ///
    /// Returns a lookup error when the operands cannot be compared this way.
    pub fn apply(self, lhs: &Value, rhs: &Value) -> CoreResult<bool> {
        let unsupported = || {
            CoreError::lookup(format!(
                "Lookup `{}` is not supported between `{}` and `{}`",
                self.name(),
                lhs.kind(),
                rhs.kind()
            ))
        };
        let order = |a: &Value, b: &Value| a.compare(b).ok_or_else(unsupported);
        let lower = |value: &Value| value.render().to_lowercase();

        Ok(match self {
            Self::Exact => lhs == rhs,
            Self::IExact => lower(lhs) == lower(rhs),
            Self::Contains => match lhs {
                Value::List(items) => items.contains(rhs),
                _ => lhs.render().contains(&rhs.render()),
            },
            Self::IContains => match lhs {
                Value::List(items) => items.iter().any(|item| lower(item) == lower(rhs)),
                _ => lower(lhs).contains(&lower(rhs)),
            },
            Self::StartsWith => match rhs {
                Value::Text(prefix) => lhs.render().starts_with(prefix.as_str()),
                _ => return Err(unsupported()),
            },
            Self::IStartsWith => lower(lhs).starts_with(&lower(rhs)),
            Self::EndsWith => lhs.render().ends_with(&rhs.render()),
            Self::IEndsWith => lower(lhs).ends_with(&lower(rhs)),
            Self::In => match (lhs, rhs) {
                (_, Value::List(items)) => items.contains(lhs),
                (Value::Text(needle), Value::Text(haystack)) => haystack.contains(needle.as_str()),
                (Value::Text(key), Value::Map(map)) => map.contains_key(key),
                _ => return Err(unsupported()),
            },
            Self::Gt => order(lhs, rhs)? == Ordering::Greater,
            Self::Gte => order(lhs, rhs)? != Ordering::Less,
            Self::Lt => order(lhs, rhs)? == Ordering::Less,
            Self::Lte => order(lhs, rhs)? != Ordering::Greater,
            Self::Range => {
                let Some([low, high]) = rhs.as_list().and_then(|b| <&[Value; 2]>::try_from(b).ok())
                else {
                    return Err(CoreError::lookup(format!(
                        "Lookup `range` needs a list of two bounds, got {rhs}"
                    )));
                };
                order(low, lhs)? != Ordering::Greater && order(lhs, high)? != Ordering::Greater
            }
        })
    }
}

/// One `key = value` lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    key: String,
    value: Value,
}

impl Lookup {
    /// Creates a lookup.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the key has an empty segment.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> CoreResult<Self> {
        let key = key.into();
        if key.split(LOOKUP_SEPARATOR).any(str::is_empty) {
            return Err(CoreError::lookup(format!("malformed lookup key `{key}`")));
        }
        Ok(Self {
            key,
            value: value.into(),
        })
    }

    /// Returns the full key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the operand.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the attribute name if the key has no path or operator.
    #[must_use]
    pub fn bare_attribute(&self) -> Option<&str> {
        (!self.key.contains(LOOKUP_SEPARATOR)).then_some(self.key.as_str())
    }

    /// Evaluates the lookup against an entity.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the first segment is not an attribute, an
    /// operator is unknown or misplaced, or the comparison is unsupported.
    pub fn matches(&self, entity: &Entity) -> CoreResult<bool> {
        let mut segments = self.key.split(LOOKUP_SEPARATOR);
        let first = segments.next().unwrap_or_default();
        let mut current = entity.field(first).ok_or_else(|| {
            CoreError::lookup(format!(
                "{} has no attribute `{first}`",
                entity.entity_type().name()
            ))
        })?;

        let rest: Vec<&str> = segments.collect();
        for (index, segment) in rest.iter().enumerate() {
            if let Some(next) = descend(&current, segment) {
                current = next;
                continue;
            }
            let operator = Operator::parse(segment)
                .ok_or_else(|| CoreError::lookup(format!("Invalid lookup: '{segment}'")))?;
            if index + 1 != rest.len() {
                return Err(CoreError::lookup(format!(
                    "operator `{segment}` must end the lookup `{}`",
                    self.key
                )));
            }
            return operator.apply(&current, &self.value);
        }
        Ok(current == self.value)
    }
}

fn descend(value: &Value, segment: &str) -> Option<Value> {
    match value {
        Value::Entity(entity) => entity.field(segment),
        Value::Map(map) => map.get(segment).cloned(),
        _ => None,
    }
}

/// Builds lookups from `(key, value)` pairs.
///
/// # Errors
///
/// Returns a lookup error for malformed keys.
pub fn lookups<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> CoreResult<Vec<Lookup>>
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(key, value)| Lookup::new(key, value))
        .collect()
}

/// Returns `true` if `entity` satisfies every lookup, stopping at the first
/// one that does not hold.
pub(crate) fn matches_all(entity: &Entity, lookups: &[Lookup]) -> CoreResult<bool> {
    for lookup in lookups {
        if !lookup.matches(entity)? {
            return Ok(false);
        }
    }
    Ok(true)
}
