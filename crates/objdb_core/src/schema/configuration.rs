//! Declarative entity schemas.

use super::storage::StorageOptions;
use crate::error::{CoreError, CoreResult, SchemaError};
use crate::value::{Value, ValueType};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A per-attribute validation predicate.
///
/// Returns `Err(message)` to reject the value. Validators never see `Null`.
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A zero-argument factory producing a default value.
pub type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// A default for an optional attribute.
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value, cloned on use.
    Value(Value),
    /// A factory invoked on every use.
    Factory(DefaultFactory),
}

impl DefaultValue {
    /// Produces the default.
    #[must_use]
    pub fn evaluate(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Which family of entity types a configuration is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    /// In-memory types; no storage options.
    Base,
    /// Persistent types; may set storage options and timestamp refresh.
    Persistent,
}

/// The schema of an entity type.
///
/// A configuration is assembled with the `with_*` builders and then handed
/// to [`Registry::register`](crate::Registry::register), which merges
/// unset sub-schemas from the parent type, validates the result and binds it
/// to the new type. A bound configuration cannot be bound again; cloning one
/// keeps the binding marker.
///
/// # Example
///
/// ```rust
/// use objdb_core::{Configuration, ValueType};
///
/// let config = Configuration::new()
///     .with_attribute("name", [ValueType::Text])
///     .with_attribute("age", [ValueType::Int, ValueType::Null])
///     .with_required(["name"])
///     .with_ordering(["-age"]);
/// assert_eq!(config.attribute_names().count(), 2);
/// ```
#[derive(Clone)]
pub struct Configuration {
    kind: ConfigKind,
    attributes: Vec<(String, Vec<ValueType>)>,
    choices: Vec<(String, Vec<Value>)>,
    required: Vec<String>,
    defaults: Vec<(String, DefaultValue)>,
    validators: Vec<(String, Vec<Validator>)>,
    ordering: Vec<String>,
    timestamp_refresh: Vec<String>,
    storage: StorageOptions,
    bound_to: Option<String>,
}

impl Configuration {
    /// Creates an empty configuration for in-memory types.
    #[must_use]
    pub fn new() -> Self {
        Self::with_kind(ConfigKind::Base)
    }

    /// Creates an empty configuration for persistent types.
    #[must_use]
    pub fn persistent() -> Self {
        Self::with_kind(ConfigKind::Persistent)
    }

    fn with_kind(kind: ConfigKind) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
            choices: Vec::new(),
            required: Vec::new(),
            defaults: Vec::new(),
            validators: Vec::new(),
            ordering: Vec::new(),
            timestamp_refresh: Vec::new(),
            storage: StorageOptions::default(),
            bound_to: None,
        }
    }

    /// Declares an attribute and the types it accepts, canonical type first.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        types: impl IntoIterator<Item = ValueType>,
    ) -> Self {
        self.attributes
            .push((name.into(), types.into_iter().collect()));
        self
    }

    /// Restricts an attribute to a fixed set of values.
    #[must_use]
    pub fn with_choices<V: Into<Value>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.choices
            .push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Marks attributes as required on construction.
    #[must_use]
    pub fn with_required<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets a fixed default for an optional attribute.
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults
            .push((name.into(), DefaultValue::Value(value.into())));
        self
    }

    /// Sets a default factory for an optional attribute.
    #[must_use]
    pub fn with_default_factory(
        mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.defaults
            .push((name.into(), DefaultValue::Factory(Arc::new(factory))));
        self
    }

    /// Appends a validator to an attribute.
    #[must_use]
    pub fn with_validator(
        mut self,
        name: impl Into<String>,
        validator: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let validator: Validator = Arc::new(validator);
        match self.validators.iter_mut().find(|(attr, _)| *attr == name) {
            Some((_, list)) => list.push(validator),
            None => self.validators.push((name, vec![validator])),
        }
        self
    }

    /// Sets the default ordering; prefix a name with `-` for descending.
    #[must_use]
    pub fn with_ordering<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.ordering.extend(names.into_iter().map(Into::into));
        self
    }

    /// Marks timestamp attributes that are set to now on every save.
    #[must_use]
    pub fn with_timestamp_refresh<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.timestamp_refresh
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the storage options of a persistent type.
    #[must_use]
    pub fn with_storage(mut self, storage: StorageOptions) -> Self {
        self.storage = storage;
        self
    }

    /// Returns the configuration kind.
    #[must_use]
    pub fn kind(&self) -> ConfigKind {
        self.kind
    }

    /// Returns the declared attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[(String, Vec<ValueType>)] {
        &self.attributes
    }

    /// Iterates over attribute names in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(name, _)| name.as_str())
    }

    /// Returns `true` if `name` is declared.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.types_of(name).is_some()
    }

    /// Returns the declared types of an attribute.
    #[must_use]
    pub fn types_of(&self, name: &str) -> Option<&[ValueType]> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, types)| types.as_slice())
    }

    /// Returns the choices of an attribute, if restricted.
    #[must_use]
    pub fn choices_for(&self, name: &str) -> Option<&[Value]> {
        self.choices
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the required attribute names.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Returns `true` if the attribute is required.
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|attr| attr == name)
    }

    /// Returns the default declared for an attribute.
    #[must_use]
    pub fn default_for(&self, name: &str) -> Option<&DefaultValue> {
        self.defaults
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, default)| default)
    }

    /// Evaluates the default of an attribute, or `Null` without one.
    #[must_use]
    pub fn get_default_for(&self, name: &str) -> Value {
        self.default_for(name)
            .map(DefaultValue::evaluate)
            .unwrap_or_default()
    }

    /// Returns the validators of an attribute.
    #[must_use]
    pub fn validators_for(&self, name: &str) -> &[Validator] {
        self.validators
            .iter()
            .find(|(attr, _)| attr == name)
            .map_or(&[], |(_, list)| list.as_slice())
    }

    /// Returns the default ordering.
    #[must_use]
    pub fn ordering(&self) -> &[String] {
        &self.ordering
    }

    /// Returns the attributes refreshed on every save.
    #[must_use]
    pub fn timestamp_refresh(&self) -> &[String] {
        &self.timestamp_refresh
    }

    /// Returns the storage options.
    #[must_use]
    pub fn storage(&self) -> &StorageOptions {
        &self.storage
    }

    /// Returns the locator of the type this configuration is bound to.
    #[must_use]
    pub fn bound_to(&self) -> Option<&str> {
        self.bound_to.as_deref()
    }

    /// Returns `true` once the configuration belongs to an entity type.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound_to.is_some()
    }

    pub(crate) fn bind(&mut self, locator: &str) {
        self.bound_to = Some(locator.to_string());
    }

    /// Copies every sub-schema that is still empty from `ancestor`.
    pub(crate) fn inherit(&mut self, ancestor: &Configuration) {
        fn fill<T: Clone>(own: &mut Vec<T>, inherited: &[T]) {
            if own.is_empty() {
                own.extend_from_slice(inherited);
            }
        }
        fill(&mut self.attributes, &ancestor.attributes);
        fill(&mut self.choices, &ancestor.choices);
        fill(&mut self.required, &ancestor.required);
        fill(&mut self.defaults, &ancestor.defaults);
        fill(&mut self.validators, &ancestor.validators);
        fill(&mut self.ordering, &ancestor.ordering);
        fill(&mut self.timestamp_refresh, &ancestor.timestamp_refresh);
    }

    /// Rejects persistent-only settings on a base configuration and a
    /// configuration of the wrong kind.
    pub(crate) fn check_kind(&self, entity_type: &str, expected: ConfigKind) -> Result<(), SchemaError> {
        let wrong = |message: String| SchemaError::WrongConfigurationKind {
            entity_type: entity_type.to_string(),
            message,
        };
        if self.kind != expected {
            return Err(wrong(format!(
                "expected a {expected:?} configuration, got {:?}",
                self.kind
            )));
        }
        if self.kind == ConfigKind::Base {
            if !self.timestamp_refresh.is_empty() {
                return Err(wrong(
                    "timestamp refresh is only available to persistent types".into(),
                ));
            }
            if !self.storage.is_default() {
                return Err(wrong(
                    "storage options are only available to persistent types".into(),
                ));
            }
        }
        Ok(())
    }

    /// Validates the merged configuration.
    ///
    /// `is_registered` answers whether an entity locator referenced by an
    /// attribute type is known.
    pub(crate) fn validate(
        &self,
        entity_type: &str,
        is_registered: &dyn Fn(&str) -> bool,
    ) -> Result<(), SchemaError> {
        self.check_references(entity_type)?;
        self.check_duplicates(entity_type)?;
        self.validate_attributes(entity_type, is_registered)?;
        self.validate_choices(entity_type)?;
        self.validate_required(entity_type)?;
        self.validate_defaults(entity_type)?;
        self.validate_timestamp_refresh(entity_type)
    }

    fn check_references(&self, entity_type: &str) -> Result<(), SchemaError> {
        let ordering = self
            .ordering
            .iter()
            .map(|name| name.trim_start_matches('-').to_string())
            .collect();
        let subconfigs: [(&'static str, Vec<String>); 6] = [
            ("choices", keyed_names(&self.choices)),
            ("required", self.required.clone()),
            ("defaults", keyed_names(&self.defaults)),
            ("validators", keyed_names(&self.validators)),
            ("ordering", ordering),
            ("timestamp_refresh", self.timestamp_refresh.clone()),
        ];
        for (subconfig, names) in subconfigs {
            if let Some(attribute) = names.into_iter().find(|name| !self.has_attribute(name)) {
                return Err(SchemaError::UnregisteredAttribute {
                    entity_type: entity_type.to_string(),
                    subconfig,
                    attribute,
                });
            }
        }
        Ok(())
    }

    fn check_duplicates(&self, entity_type: &str) -> Result<(), SchemaError> {
        let duplicate = |subconfig: &'static str, entry: &str| SchemaError::Duplicates {
            entity_type: entity_type.to_string(),
            subconfig,
            entry: entry.to_string(),
        };
        let names: [(&'static str, Vec<&str>); 6] = [
            ("attributes", self.attributes.iter().map(|(n, _)| n.as_str()).collect()),
            ("choices", self.choices.iter().map(|(n, _)| n.as_str()).collect()),
            ("required", self.required.iter().map(String::as_str).collect()),
            ("defaults", self.defaults.iter().map(|(n, _)| n.as_str()).collect()),
            ("ordering", self.ordering.iter().map(String::as_str).collect()),
            ("timestamp_refresh", self.timestamp_refresh.iter().map(String::as_str).collect()),
        ];
        for (subconfig, entries) in names {
            if let Some(entry) = first_duplicate(entries) {
                return Err(duplicate(subconfig, entry));
            }
        }
        for (name, types) in &self.attributes {
            let mut seen = HashSet::new();
            if types.iter().any(|ty| !seen.insert(ty)) {
                return Err(duplicate("attributes", name));
            }
        }
        for (name, values) in &self.choices {
            let repeated = values
                .iter()
                .enumerate()
                .any(|(i, value)| values[..i].contains(value));
            if repeated {
                return Err(duplicate("choices", name));
            }
        }
        Ok(())
    }

    fn validate_attributes(
        &self,
        entity_type: &str,
        is_registered: &dyn Fn(&str) -> bool,
    ) -> Result<(), SchemaError> {
        for (name, types) in &self.attributes {
            if types.is_empty() {
                return Err(SchemaError::invalid(
                    entity_type,
                    "attributes",
                    format!("`{name}` declares no types"),
                ));
            }
            for locator in types.iter().filter_map(ValueType::entity_locator) {
                if !is_registered(locator) {
                    return Err(SchemaError::invalid(
                        entity_type,
                        "attributes",
                        format!("`{name}` references unknown entity type `{locator}`"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_choices(&self, entity_type: &str) -> Result<(), SchemaError> {
        for (name, values) in &self.choices {
            if values.len() < 2 {
                return Err(SchemaError::invalid(
                    entity_type,
                    "choices",
                    format!("`{name}` must have at least 2 choices; use a default instead"),
                ));
            }
            let types = self.types_of(name).unwrap_or(&[]);
            for (i, value) in values.iter().enumerate() {
                if !types.iter().any(|ty| ty.matches(value)) {
                    return Err(SchemaError::invalid(
                        entity_type,
                        "choices",
                        format!("choice {} for `{name}` does not match its types", i + 1),
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_required(&self, entity_type: &str) -> Result<(), SchemaError> {
        match self.required.iter().find(|name| self.default_for(name).is_some()) {
            Some(name) => Err(SchemaError::invalid(
                entity_type,
                "required",
                format!("required attribute `{name}` cannot have a default"),
            )),
            None => Ok(()),
        }
    }

    fn validate_defaults(&self, entity_type: &str) -> Result<(), SchemaError> {
        for (name, default) in &self.defaults {
            let value = default.evaluate();
            let types = self.types_of(name).unwrap_or(&[]);
            if !types.iter().any(|ty| ty.matches(&value)) {
                return Err(SchemaError::invalid(
                    entity_type,
                    "defaults",
                    format!("default for `{name}` does not match its types"),
                ));
            }
        }
        Ok(())
    }

    fn validate_timestamp_refresh(&self, entity_type: &str) -> Result<(), SchemaError> {
        for name in &self.timestamp_refresh {
            let types = self.types_of(name).unwrap_or(&[]);
            if types.iter().any(|ty| *ty != ValueType::DateTime) {
                return Err(SchemaError::invalid(
                    entity_type,
                    "timestamp_refresh",
                    format!("`{name}` must be declared as a datetime only"),
                ));
            }
        }
        Ok(())
    }

    /// Completes a set of provided attributes.
    ///
    /// Every declared attribute appears in the result: the provided value,
    /// else its default, else `Null`. An explicit `Null` on an attribute that
    /// does not accept `Null` counts as not provided.
    ///
    /// # Errors
    ///
    /// Returns `UnregisteredAttribute` for undeclared names and
    /// `AttributeRequired` when a required attribute is missing.
    pub fn filter_attrs(
        &self,
        entity_type: &str,
        provided: impl IntoIterator<Item = (String, Value)>,
    ) -> CoreResult<BTreeMap<String, Value>> {
        let mut provided: BTreeMap<String, Value> = provided.into_iter().collect();
        if let Some(unknown) = provided.keys().find(|name| !self.has_attribute(name)) {
            return Err(CoreError::unregistered(entity_type, unknown.clone()));
        }

        let mut filtered = BTreeMap::new();
        for (name, types) in &self.attributes {
            let value = provided
                .remove(name)
                .filter(|value| !value.is_null() || types.iter().any(|ty| ty.matches(value)));
            let value = match value {
                Some(value) => value,
                None if self.is_required(name) => {
                    return Err(CoreError::AttributeRequired {
                        entity_type: entity_type.to_string(),
                        attribute: name.clone(),
                    })
                }
                None => self.get_default_for(name),
            };
            filtered.insert(name.clone(), value);
        }
        Ok(filtered)
    }
}

fn keyed_names<T>(entries: &[(String, T)]) -> Vec<String> {
    entries.iter().map(|(name, _)| name.clone()).collect()
}

fn first_duplicate<'a>(entries: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    entries.into_iter().find(|entry| !seen.insert(*entry))
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("kind", &self.kind)
            .field("attributes", &self.attributes)
            .field("choices", &self.choices)
            .field("required", &self.required)
            .field("defaults", &self.defaults)
            .field(
                "validators",
                &self
                    .validators
                    .iter()
                    .map(|(name, list)| (name, list.len()))
                    .collect::<Vec<_>>(),
            )
            .field("ordering", &self.ordering)
            .field("timestamp_refresh", &self.timestamp_refresh)
            .field("storage", &self.storage)
            .field("bound_to", &self.bound_to)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Configuration {
        Configuration::new()
            .with_attribute("name", [ValueType::Text])
            .with_attribute("age", [ValueType::Int, ValueType::Null])
            .with_attribute("status", [ValueType::Text])
            .with_choices("status", ["active", "retired"])
            .with_default("status", "active")
            .with_required(["name"])
    }

    fn validate(config: &Configuration) -> Result<(), SchemaError> {
        config.validate("Person", &|locator| locator == "Person")
    }

    #[test]
    fn valid_configuration_passes() {
        validate(&person()).unwrap();
    }

    #[test]
    fn reference_to_undeclared_attribute_fails() {
        let config = person().with_ordering(["-height"]);
        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnregisteredAttribute { subconfig: "ordering", ref attribute, .. }
                if attribute == "height"
        ));
    }

    #[test]
    fn duplicates_are_rejected() {
        let config = person().with_required(["name"]);
        assert!(matches!(
            validate(&config),
            Err(SchemaError::Duplicates { subconfig: "required", .. })
        ));

        let config = Configuration::new().with_attribute("n", [ValueType::Int, ValueType::Int]);
        assert!(matches!(
            validate(&config),
            Err(SchemaError::Duplicates { subconfig: "attributes", .. })
        ));

        let config = Configuration::new()
            .with_attribute("n", [ValueType::Int])
            .with_choices("n", [1, 2, 1]);
        assert!(matches!(
            validate(&config),
            Err(SchemaError::Duplicates { subconfig: "choices", .. })
        ));
    }

    #[test]
    fn choices_need_two_matching_values() {
        let config = Configuration::new()
            .with_attribute("n", [ValueType::Int])
            .with_choices("n", [1]);
        assert!(matches!(
            validate(&config),
            Err(SchemaError::Invalid { subconfig: "choices", .. })
        ));

        let config = Configuration::new()
            .with_attribute("n", [ValueType::Int])
            .with_choices("n", [Value::Int(1), Value::from("two")]);
        assert!(matches!(
            validate(&config),
            Err(SchemaError::Invalid { subconfig: "choices", .. })
        ));
    }

    #[test]
    fn required_attribute_cannot_have_default() {
        let config = person().with_default("name", "anon");
        assert!(matches!(
            validate(&config),
            Err(SchemaError::Invalid { subconfig: "required", .. })
        ));
    }

    #[test]
    fn default_factories_are_type_checked() {
        let config = Configuration::new()
            .with_attribute("n", [ValueType::Int])
            .with_default_factory("n", || Value::from("nope"));
        assert!(matches!(
            validate(&config),
            Err(SchemaError::Invalid { subconfig: "defaults", .. })
        ));
    }

    #[test]
    fn unknown_entity_locator_is_rejected() {
        let config = Configuration::new().with_attribute("owner", [ValueType::entity("Team")]);
        assert!(matches!(
            validate(&config),
            Err(SchemaError::Invalid { subconfig: "attributes", .. })
        ));
    }

    #[test]
    fn timestamp_refresh_requires_datetime() {
        let config = Configuration::persistent()
            .with_attribute("touched", [ValueType::DateTime, ValueType::Null])
            .with_timestamp_refresh(["touched"]);
        assert!(matches!(
            validate(&config),
            Err(SchemaError::Invalid { subconfig: "timestamp_refresh", .. })
        ));

        let config = Configuration::persistent()
            .with_attribute("touched", [ValueType::DateTime])
            .with_timestamp_refresh(["touched"]);
        validate(&config).unwrap();
    }

    #[test]
    fn timestamp_refresh_attributes_start_null() {
        use crate::entity::{EntityType, Registry};

        let registry = Registry::new();
        let task = registry
            .register(
                EntityType::persistent("Task").config(
                    Configuration::persistent()
                        .with_attribute("touched", [ValueType::DateTime])
                        .with_timestamp_refresh(["touched"]),
                ),
            )
            .unwrap();
        let mut entity = task.create(std::iter::empty::<(&str, Value)>()).unwrap();
        assert_eq!(entity.get("touched"), Some(&Value::Null));
        entity.set("touched", Value::Null).unwrap();
    }

    #[test]
    fn base_configuration_rejects_persistent_settings() {
        let config = Configuration::new()
            .with_attribute("touched", [ValueType::DateTime])
            .with_timestamp_refresh(["touched"]);
        assert!(config.check_kind("Person", ConfigKind::Base).is_err());
        assert!(person()
            .check_kind("Person", ConfigKind::Persistent)
            .is_err());
        person().check_kind("Person", ConfigKind::Base).unwrap();
    }

    #[test]
    fn inherit_fills_only_empty_subconfigs() {
        let parent = person().with_ordering(["name"]);
        let mut child = Configuration::new()
            .with_attribute("name", [ValueType::Text])
            .with_attribute("age", [ValueType::Int, ValueType::Null])
            .with_attribute("status", [ValueType::Text])
            .with_ordering(["-age"]);
        child.inherit(&parent);

        assert_eq!(child.ordering(), ["-age".to_string()]);
        assert_eq!(child.required(), ["name".to_string()]);
        assert_eq!(child.choices_for("status").unwrap().len(), 2);
    }

    #[test]
    fn filter_attrs_completes_declared_attributes() {
        let config = person();
        let attrs = config
            .filter_attrs("Person", [("name".to_string(), Value::from("Ada"))])
            .unwrap();

        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs["status"], Value::from("active"));
        assert!(attrs["age"].is_null());
    }

    #[test]
    fn filter_attrs_treats_disallowed_null_as_unset() {
        let config = person();
        let attrs = config
            .filter_attrs(
                "Person",
                [
                    ("name".to_string(), Value::from("Ada")),
                    ("status".to_string(), Value::Null),
                ],
            )
            .unwrap();
        assert_eq!(attrs["status"], Value::from("active"));

        let err = config
            .filter_attrs("Person", [("name".to_string(), Value::Null)])
            .unwrap_err();
        assert!(matches!(err, CoreError::AttributeRequired { ref attribute, .. } if attribute == "name"));
    }

    #[test]
    fn filter_attrs_rejects_unknown_names() {
        let err = person()
            .filter_attrs(
                "Person",
                [
                    ("name".to_string(), Value::from("Ada")),
                    ("height".to_string(), Value::Int(170)),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::UnregisteredAttribute { .. }));
    }

    #[test]
    fn validators_accumulate_per_attribute() {
        let config = person()
            .with_validator("name", |_| Ok(()))
            .with_validator("name", |_| Err("no".into()));
        assert_eq!(config.validators_for("name").len(), 2);
        assert!(config.validators_for("age").is_empty());
    }
}
