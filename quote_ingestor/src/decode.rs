//! Optional-value decoding for the provider's loosely typed JSON.
//!
//! The quote API mixes numbers, numeric strings, empty strings and `null` for the
//! same attribute. Every record decoder in this crate goes through the helpers
//! below so that the null-vs-value rule is applied in exactly one place:
//! `null`, a missing key and `""` all decode to `None`.

use std::str::FromStr;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;

/// A field was present but could not be read as the expected type.
#[derive(Debug, Error, PartialEq)]
#[error("field `{field}`: {reason}")]
pub struct DecodeError {
    pub field: String,
    pub reason: String,
}

impl DecodeError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Keyed view over one decoded record.
pub trait FieldSource {
    fn field(&self, key: &str) -> Option<&Value>;
}

impl FieldSource for Map<String, Value> {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl FieldSource for IndexMap<&str, &Value> {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key).copied()
    }
}

/// Returns the raw value unless it is absent, `null` or a blank string.
fn present<'a, S: FieldSource + ?Sized>(src: &'a S, key: &str) -> Option<&'a Value> {
    match src.field(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

fn parse_decimal_str(field: &str, raw: &str) -> Result<Decimal, DecodeError> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| DecodeError::new(field, format!("not a decimal ({raw}): {e}")))
}

/// Optional exact decimal.
pub fn opt_decimal<S: FieldSource + ?Sized>(
    src: &S,
    key: &str,
) -> Result<Option<Decimal>, DecodeError> {
    match present(src, key) {
        None => Ok(None),
        Some(Value::Number(n)) => parse_decimal_str(key, &n.to_string()).map(Some),
        Some(Value::String(s)) => parse_decimal_str(key, s).map(Some),
        Some(other) => Err(DecodeError::new(key, format!("unexpected {other}"))),
    }
}

/// Optional integer. Whole-valued floats (`1.2E7`) are accepted since the provider
/// emits large volumes in exponent form.
pub fn opt_i64<S: FieldSource + ?Sized>(src: &S, key: &str) -> Result<Option<i64>, DecodeError> {
    match present(src, key) {
        None => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                _ => Err(DecodeError::new(key, format!("not an integer: {n}"))),
            }
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Some(i));
            }
            let d = parse_decimal_str(key, s)?;
            if d.fract().is_zero() {
                i64::try_from(d)
                    .map(Some)
                    .map_err(|e| DecodeError::new(key, e.to_string()))
            } else {
                Err(DecodeError::new(key, format!("not an integer: {s}")))
            }
        }
        Some(other) => Err(DecodeError::new(key, format!("unexpected {other}"))),
    }
}

pub fn opt_bool<S: FieldSource + ?Sized>(src: &S, key: &str) -> Result<Option<bool>, DecodeError> {
    match present(src, key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Number(n)) => Ok(Some(n.as_i64().unwrap_or(0) != 0)),
        Some(Value::String(s)) => match s.trim() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            other => Err(DecodeError::new(key, format!("not a bool: {other}"))),
        },
        Some(other) => Err(DecodeError::new(key, format!("unexpected {other}"))),
    }
}

pub fn opt_string<S: FieldSource + ?Sized>(
    src: &S,
    key: &str,
) -> Result<Option<String>, DecodeError> {
    match present(src, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(DecodeError::new(key, format!("unexpected {other}"))),
    }
}

/// Mandatory string.
pub fn req_string<S: FieldSource + ?Sized>(src: &S, key: &str) -> Result<String, DecodeError> {
    opt_string(src, key)?.ok_or_else(|| DecodeError::new(key, "missing"))
}

/// Mandatory integer.
pub fn req_i64<S: FieldSource + ?Sized>(src: &S, key: &str) -> Result<i64, DecodeError> {
    opt_i64(src, key)?.ok_or_else(|| DecodeError::new(key, "missing"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn null_missing_and_blank_are_all_none() {
        let src = obj(json!({ "pe": null, "pb": "", "ps": "  " }));
        assert_eq!(opt_decimal(&src, "pe").unwrap(), None);
        assert_eq!(opt_decimal(&src, "pb").unwrap(), None);
        assert_eq!(opt_decimal(&src, "ps").unwrap(), None);
        assert_eq!(opt_decimal(&src, "pcf").unwrap(), None);
    }

    #[test]
    fn decimals_keep_their_textual_precision() {
        let src = obj(json!({ "close": 10.23, "pe": "7.8915", "cap": 1.5e3 }));
        assert_eq!(opt_decimal(&src, "close").unwrap(), Some(Decimal::new(1023, 2)));
        assert_eq!(opt_decimal(&src, "pe").unwrap(), Some(Decimal::new(78915, 4)));
        assert_eq!(opt_decimal(&src, "cap").unwrap(), Some(Decimal::from(1500)));
    }

    #[test]
    fn integers_accept_whole_floats_and_strings() {
        let src = obj(json!({ "a": 12, "b": 1.2e7, "c": "42", "d": 1.5 }));
        assert_eq!(opt_i64(&src, "a").unwrap(), Some(12));
        assert_eq!(opt_i64(&src, "b").unwrap(), Some(12_000_000));
        assert_eq!(opt_i64(&src, "c").unwrap(), Some(42));
        assert!(opt_i64(&src, "d").is_err());
    }

    #[test]
    fn wrong_shapes_are_errors() {
        let src = obj(json!({ "pe": [1, 2], "name": {"x": 1} }));
        let err = opt_decimal(&src, "pe").unwrap_err();
        assert_eq!(err.field, "pe");
        assert!(opt_string(&src, "name").is_err());
        assert!(req_string(&src, "symbol").is_err());
    }
}
