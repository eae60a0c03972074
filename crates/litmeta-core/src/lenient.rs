//! Lenient integer decoding for caller-supplied fields.
//!
//! Callers send years and page numbers as numbers, numeric strings or
//! `null`; all of them decode, with `null`/empty meaning 0.

use serde::de::{Deserializer, Error};
use serde::Deserialize;
use serde_json::Value;

fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Null => Some(0),
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) if s.trim().is_empty() => Some(0),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    to_i64(&value).ok_or_else(|| D::Error::custom(format!("expected an integer, got {value}")))
}

pub(crate) fn int32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let n = int(deserializer)?;
    i32::try_from(n).map_err(|_| D::Error::custom(format!("integer {n} out of range")))
}

/// A list field where `null` means empty.
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
