//! Lenient decoding for reconfiguration bodies.
//!
//! Each recognized field is decoded on its own: a value that cannot be
//! coerced to the field's numeric type is dropped for that field only and
//! never fails the request.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Override for a sentinel-nullable field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Nullable<T> {
    /// Explicit `null`: return the feature to "not configured".
    Unset,
    Set(T),
}

/// Parse an override body. Anything that is not a JSON object yields the
/// empty override set.
pub fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => T::deserialize(value).unwrap_or_default(),
        _ => T::default(),
    }
}

/// Numbers pass through; numeric strings are parsed. Non-finite results
/// are rejected.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Like [`coerce_f64`], rounded to the nearest integer. Negative values
/// are rejected.
pub fn coerce_u64(value: &Value) -> Option<u64> {
    coerce_f64(value)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u64)
}

pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value))
}

pub fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_u64(&value))
}

/// Absent stays `None` (via `#[serde(default)]`), `null` becomes
/// [`Nullable::Unset`], a coercible number becomes [`Nullable::Set`].
pub fn lenient_nullable_f64<'de, D>(deserializer: D) -> Result<Option<Nullable<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => Some(Nullable::Unset),
        other => coerce_f64(&other).map(Nullable::Set),
    })
}
