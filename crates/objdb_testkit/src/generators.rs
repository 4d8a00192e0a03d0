//! Property-based test generators using proptest.

use objdb_core::Value;
use proptest::prelude::*;

/// Strategy for person names: a capital followed by lowercase letters.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{1,8}").expect("Invalid regex")
}

/// Strategy for ages.
pub fn age_strategy() -> impl Strategy<Value = i64> {
    0i64..120
}

/// Strategy for `(name, age)` rows.
pub fn people_strategy(max: usize) -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec((name_strategy(), age_strategy()), 0..=max)
}

/// Strategy for book titles that pass the `not_blank` validator.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,23}").expect("Invalid regex")
}

/// Strategy for page counts accepted by the library `Book` type.
pub fn pages_strategy() -> impl Strategy<Value = i64> {
    1i64..=10_000
}

/// Strategy for tag lists.
pub fn tags_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
        0..4,
    )
}

/// Strategy for comparison operators accepted by integer lookups.
pub fn int_operator_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["exact", "gt", "gte", "lt", "lte"])
}

/// Strategy for scalar values that survive a JSON round trip unchanged.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::Text),
    ]
}
