//! Mapping between entities and wire documents.
//!
//! Encoding writes every declared attribute, the type locator and, once
//! saved, the primary key. Nested entities become nested documents of the
//! same shape; timestamps become ISO-8601 strings.
//!
//! Decoding coerces each stored attribute to the first declared type that
//! accepts it. Nested documents carrying a type locator are rebuilt as
//! entities of the registered type.

use crate::config::AdapterConfig;
use crate::entity::{Entity, EntityType, Registry};
use crate::error::{CoreResult, DatabaseError};
use crate::value::{Value, ValueType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use objdb_backend::Document;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Encodes and decodes wire documents for one registry.
#[derive(Debug, Clone, Copy)]
pub struct WireFormat<'a> {
    registry: &'a Registry,
    config: &'a AdapterConfig,
}

impl<'a> WireFormat<'a> {
    /// Creates a wire format resolving nested types through `registry`.
    #[must_use]
    pub fn new(registry: &'a Registry, config: &'a AdapterConfig) -> Self {
        Self { registry, config }
    }

    /// Encodes an entity.
    ///
    /// # Errors
    ///
    /// Returns `NotPersistent` if the entity, or an entity nested in it, is
    /// not of a persistent type, and `InvalidDocument` for non-finite
    /// floats.
    pub fn encode(&self, entity: &Entity) -> CoreResult<Document> {
        let entity_type = entity.entity_type();
        if !entity_type.is_persistent() {
            return Err(DatabaseError::NotPersistent {
                entity_type: entity_type.name().to_string(),
            }
            .into());
        }

        let mut document = Document::new();
        for name in entity_type.config().attribute_names() {
            let value = entity.get(name).unwrap_or(&Value::Null);
            document.insert(name.to_string(), self.encode_value(value)?);
        }
        document.insert(
            self.config.type_field.clone(),
            Json::String(entity_type.locator().to_string()),
        );
        if let Some(pkey) = entity.pkey() {
            document.insert(
                self.config.primary_key_field.clone(),
                Json::String(pkey.to_string()),
            );
        }
        Ok(document)
    }

    /// Encodes a single value.
    ///
    /// # Errors
    ///
    /// See [`encode`](Self::encode).
    pub fn encode_value(&self, value: &Value) -> CoreResult<Json> {
        Ok(match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map(Json::Number)
                .ok_or_else(|| DatabaseError::invalid_document(format!("cannot store float {x}")))?,
            Value::Text(s) => Json::String(s.clone()),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Date(_) | Value::Time(_) => Json::String(value.to_string()),
            Value::List(items) => Json::Array(
                items
                    .iter()
                    .map(|item| self.encode_value(item))
                    .collect::<CoreResult<_>>()?,
            ),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(key, item)| Ok((key.clone(), self.encode_value(item)?)))
                    .collect::<CoreResult<_>>()?,
            ),
            Value::Entity(entity) => Json::Object(self.encode(entity)?),
        })
    }

    /// Rebuilds an entity of `entity_type` from a stored document.
    ///
    /// Validators are not run. Attributes missing from the document, or
    /// that no declared type accepts, are left unset and receive their
    /// default. A stored `null` is kept as `Null`.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested document names an unknown type or
    /// cannot be rebuilt, or if a required attribute ends up unset.
    pub fn decode(&self, entity_type: &Arc<EntityType>, document: &Document) -> CoreResult<Entity> {
        let mut attrs = BTreeMap::new();
        for (name, types) in entity_type.config().attributes() {
            let Some(raw) = document.get(name) else {
                continue;
            };
            if raw.is_null() {
                attrs.insert(name.clone(), Value::Null);
                continue;
            }
            let mut coerced = None;
            for ty in types {
                if let Some(value) = self.coerce(raw, ty)? {
                    coerced = Some(value);
                    break;
                }
            }
            match coerced {
                Some(value) => {
                    attrs.insert(name.clone(), value);
                }
                None => debug!(
                    entity_type = %entity_type.name(),
                    attribute = %name,
                    "stored value fits no declared type, leaving it unset"
                ),
            }
        }

        let pkey = match document.get(&self.config.primary_key_field) {
            Some(Json::String(key)) => Some(key.clone()),
            Some(Json::Number(key)) => Some(key.to_string()),
            _ => None,
        };
        Entity::reconstruct(entity_type, attrs, pkey)
    }

    fn type_tag<'d>(&self, object: &'d Document) -> Option<&'d str> {
        object.get(&self.config.type_field).and_then(Json::as_str)
    }

    fn decode_nested(&self, object: &Document) -> CoreResult<Option<Entity>> {
        let Some(locator) = self.type_tag(object) else {
            return Ok(None);
        };
        let entity_type = self.registry.resolve(locator)?;
        self.decode(&entity_type, object).map(Some)
    }

    fn coerce(&self, raw: &Json, ty: &ValueType) -> CoreResult<Option<Value>> {
        Ok(match (ty, raw) {
            (ValueType::Any, _) => Some(self.decode_any(raw)?),
            (ValueType::Null, Json::Null) => Some(Value::Null),
            (ValueType::Bool, Json::Bool(b)) => Some(Value::Bool(*b)),
            (ValueType::Int, Json::Number(n)) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|x| x.fract() == 0.0 && x.abs() < i64::MAX as f64)
                    .map(|x| x as i64)
            }).map(Value::Int),
            (ValueType::Int, Json::String(s)) => s.trim().parse::<i64>().ok().map(Value::Int),
            (ValueType::Float, Json::Number(n)) => n.as_f64().map(Value::Float),
            (ValueType::Float, Json::String(s)) => s.trim().parse::<f64>().ok().map(Value::Float),
            (ValueType::Text, Json::String(s)) => Some(Value::Text(s.clone())),
            (ValueType::Text, Json::Number(n)) => Some(Value::Text(n.to_string())),
            (ValueType::Text, Json::Bool(b)) => Some(Value::Text(b.to_string())),
            (ValueType::DateTime, Json::String(s)) => parse_datetime(s).map(Value::DateTime),
            (ValueType::Date, Json::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
                .map(Value::Date),
            (ValueType::Time, Json::String(s)) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .ok()
                .or_else(|| parse_datetime(s).map(|dt| dt.time()))
                .map(Value::Time),
            (ValueType::List, Json::Array(items)) => Some(Value::List(
                items
                    .iter()
                    .map(|item| self.decode_any(item))
                    .collect::<CoreResult<_>>()?,
            )),
            (ValueType::Map, Json::Object(object)) if self.type_tag(object).is_none() => {
                Some(self.decode_map(object)?)
            }
            (ValueType::Entity(locator), Json::Object(object)) => self
                .decode_nested(object)?
                .filter(|entity| entity.entity_type().is_a(locator))
                .map(Value::from),
            (ValueType::EntityList(locator), Json::Array(items)) => {
                let mut entities = Vec::with_capacity(items.len());
                for item in items {
                    let entity = match item {
                        Json::Object(object) => self.decode_nested(object)?,
                        _ => None,
                    };
                    match entity.filter(|entity| entity.entity_type().is_a(locator)) {
                        Some(entity) => entities.push(Value::from(entity)),
                        None => return Ok(None),
                    }
                }
                Some(Value::List(entities))
            }
            _ => None,
        })
    }

    fn decode_map(&self, object: &Document) -> CoreResult<Value> {
        Ok(Value::Map(
            object
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.decode_any(item)?)))
                .collect::<CoreResult<_>>()?,
        ))
    }

    fn decode_any(&self, raw: &Json) -> CoreResult<Value> {
        Ok(match raw {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::List(
                items
                    .iter()
                    .map(|item| self.decode_any(item))
                    .collect::<CoreResult<_>>()?,
            ),
            Json::Object(object) => match self.decode_nested(object)? {
                Some(entity) => Value::from(entity),
                None => self.decode_map(object)?,
            },
        })
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
