//! Collection naming.

use crate::schema::StorageOptions;
use chrono::NaiveDate;
use convert_case::{Case, Casing};

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("datum", "data"),
];

const UNCOUNTABLE: &[&str] = &["data", "information", "series", "species", "equipment", "news"];

/// Pluralizes the last word of a snake-cased name.
#[must_use]
pub fn pluralize(name: &str) -> String {
    let (head, word) = match name.rfind('_') {
        Some(split) => name.split_at(split + 1),
        None => ("", name),
    };
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return name.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return format!("{head}{plural}");
    }

    let plural = if ["s", "x", "z", "ch", "sh"].iter().any(|end| word.ends_with(end)) {
        format!("{word}es")
    } else if let Some(stem) = word.strip_suffix('y').filter(|stem| {
        stem.chars()
            .last()
            .is_some_and(|c| !"aeiou".contains(c))
    }) {
        format!("{stem}ies")
    } else {
        format!("{word}s")
    };
    format!("{head}{plural}")
}

/// Returns the default collection name of a type: its pluralized snake-cased
/// name.
#[must_use]
pub fn default_collection_name(type_name: &str) -> String {
    pluralize(&type_name.to_case(Case::Snake))
}

/// Appends the daily partition suffix `_for_YYYY_MM_DD`.
#[must_use]
pub fn partitioned(base: &str, date: NaiveDate) -> String {
    format!("{base}_for_{}", date.format("%Y_%m_%d"))
}

/// Resolves the collection of a type for the given day.
#[must_use]
pub fn collection_name(type_name: &str, storage: &StorageOptions, today: NaiveDate) -> String {
    let base = storage
        .collection_name
        .clone()
        .unwrap_or_else(|| default_collection_name(type_name));
    if storage.daily_partition {
        partitioned(&base, today)
    } else {
        base
    }
}
