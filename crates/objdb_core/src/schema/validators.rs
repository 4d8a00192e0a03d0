//! Reusable attribute validators.
//!
//! Each function returns a closure suitable for
//! [`Configuration::with_validator`](crate::Configuration::with_validator).

use crate::value::Value;
use chrono::Utc;

/// Rejects empty text, empty lists and maps, zero and `false`.
pub fn not_blank() -> impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static {
    |value: &Value| {
        let blank = match value {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(n) => *n == 0,
            Value::Float(f) => *f == 0.0,
            Value::Text(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        };
        if blank {
            Err("This field cannot be blank.".into())
        } else {
            Ok(())
        }
    }
}

/// Requires the character count of text (or the length of a list) to lie
/// in `min..=max`.
pub fn length_between(
    min: usize,
    max: usize,
) -> impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static {
    move |value: &Value| {
        let len = match value {
            Value::Text(s) => s.chars().count(),
            Value::List(items) => items.len(),
            other => return Err(format!("length of a {} is undefined", other.kind())),
        };
        if (min..=max).contains(&len) {
            Ok(())
        } else {
            Err(format!("length must be between {min} and {max}, got {len}"))
        }
    }
}

/// Requires an integer in `min..=max`.
pub fn int_between(min: i64, max: i64) -> impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static {
    move |value: &Value| match value.as_int() {
        Some(n) if (min..=max).contains(&n) => Ok(()),
        Some(n) => Err(format!("must be between {min} and {max}, got {n}")),
        None => Err(format!("expected an integer, got {}", value.kind())),
    }
}

/// Rejects dates, timestamps and times earlier than now (UTC).
pub fn not_in_past() -> impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static {
    |value: &Value| {
        let now = Utc::now();
        let past = match value {
            Value::DateTime(dt) => *dt < now,
            Value::Date(d) => *d < now.date_naive(),
            Value::Time(t) => *t < now.time(),
            _ => false,
        };
        if !past {
            return Ok(());
        }
        let kind = match value {
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            _ => "datetime",
        };
        Err(format!("This {kind} field cannot be in the past."))
    }
}

/// Requires the value to equal one of `allowed`.
pub fn one_of<V: Into<Value>>(
    allowed: impl IntoIterator<Item = V>,
) -> impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static {
    let allowed: Vec<Value> = allowed.into_iter().map(Into::into).collect();
    move |value: &Value| {
        if allowed.contains(value) {
            Ok(())
        } else {
            Err(format!("{value} is not an allowed value"))
        }
    }
}
