//! CBOR encoding of values.
//!
//! Values are lowered to [`ciborium::value::Value`] and written with
//! `ciborium`. Kinds CBOR has no native type for are carried in tags:
//!
//! | Value       | CBOR                                  |
//! |-------------|---------------------------------------|
//! | `Date`      | tag 1 over epoch seconds (float)      |
//! | `Regex`     | tag 35 over the source pattern        |
//! | `Undefined` | tag [`TAG_UNDEFINED`] over `null`     |
//!
//! Integral numbers are written as CBOR integers, everything else as floats.

use crate::error::{CodecError, CodecResult};
use crate::path::{Path, PathSegment};
use crate::value::{Map, Value};
use chrono::DateTime;
use ciborium::value::{Integer, Value as Cbor};

/// Standard tag for epoch-based date/time.
pub const TAG_EPOCH: u64 = 1;
/// Standard tag for regular expressions.
pub const TAG_REGEX: u64 = 35;
/// Unassigned tag used for the absent sentinel.
pub const TAG_UNDEFINED: u64 = 39_999;

// Largest integer an f64 holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Encodes a value to CBOR bytes.
///
/// Fails with [`CodecError::Cycle`] if the value contains a reference cycle.
pub fn encode(value: &Value) -> CodecResult<Vec<u8>> {
    let mut ancestors = Vec::new();
    let lowered = lower(value, &mut Path::root(), &mut ancestors)?;
    let mut bytes = Vec::new();
    ciborium::into_writer(&lowered, &mut bytes)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(bytes)
}

/// Decodes a value from CBOR bytes.
pub fn decode(bytes: &[u8]) -> CodecResult<Value> {
    let raw: Cbor =
        ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))?;
    lift(raw)
}

#[allow(clippy::cast_possible_truncation)]
fn lower_number(n: f64) -> Cbor {
    let integral = n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER;
    if integral && !(n == 0.0 && n.is_sign_negative()) {
        Cbor::Integer(Integer::from(n as i64))
    } else {
        Cbor::Float(n)
    }
}

#[allow(clippy::cast_precision_loss)]
fn lower(value: &Value, path: &mut Path, ancestors: &mut Vec<usize>) -> CodecResult<Cbor> {
    Ok(match value {
        Value::Undefined => Cbor::Tag(TAG_UNDEFINED, Box::new(Cbor::Null)),
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Number(n) => lower_number(*n),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Date(d) => Cbor::Tag(
            TAG_EPOCH,
            Box::new(Cbor::Float(d.timestamp_millis() as f64 / 1000.0)),
        ),
        Value::Regex(source) => Cbor::Tag(TAG_REGEX, Box::new(Cbor::Text(source.clone()))),
        Value::Array(array) => {
            enter(array.id(), path, ancestors)?;
            let mut items = Vec::with_capacity(array.len());
            for (i, item) in array.iter().enumerate() {
                path.push(PathSegment::Index(i));
                let lowered = lower(item, path, ancestors);
                path.pop();
                items.push(lowered?);
            }
            ancestors.pop();
            Cbor::Array(items)
        }
        Value::Object(object) => {
            enter(object.id(), path, ancestors)?;
            let mut entries = Vec::with_capacity(object.len());
            for (key, item) in object.iter() {
                path.push(PathSegment::Key(key.clone()));
                let lowered = lower(item, path, ancestors);
                path.pop();
                entries.push((Cbor::Text(key.clone()), lowered?));
            }
            ancestors.pop();
            Cbor::Map(entries)
        }
    })
}

fn enter(id: usize, path: &Path, ancestors: &mut Vec<usize>) -> CodecResult<()> {
    if ancestors.contains(&id) {
        return Err(CodecError::Cycle {
            path: path.to_string(),
        });
    }
    ancestors.push(id);
    Ok(())
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn lift(raw: Cbor) -> CodecResult<Value> {
    Ok(match raw {
        Cbor::Null => Value::Null,
        Cbor::Bool(b) => Value::Bool(b),
        Cbor::Integer(i) => Value::Number(i128::from(i) as f64),
        Cbor::Float(f) => Value::Number(f),
        Cbor::Text(s) => Value::Text(s),
        Cbor::Bytes(_) => return Err(CodecError::unsupported_type("byte string")),
        Cbor::Array(items) => Value::array(
            items
                .into_iter()
                .map(lift)
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        Cbor::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, item) in entries {
                let key = match key {
                    Cbor::Text(k) => k,
                    Cbor::Integer(i) => i128::from(i).to_string(),
                    _ => return Err(CodecError::invalid_structure("map keys must be text")),
                };
                map.insert(key, lift(item)?);
            }
            Value::from(map)
        }
        Cbor::Tag(TAG_UNDEFINED, _) => Value::Undefined,
        Cbor::Tag(TAG_EPOCH, inner) => {
            let seconds = match *inner {
                Cbor::Integer(i) => i128::from(i) as f64,
                Cbor::Float(f) => f,
                _ => return Err(CodecError::invalid_structure("date tag must wrap a number")),
            };
            let millis = (seconds * 1000.0).round() as i64;
            DateTime::from_timestamp_millis(millis)
                .map(Value::Date)
                .ok_or_else(|| CodecError::invalid_structure("date out of range"))?
        }
        Cbor::Tag(TAG_REGEX, inner) => match *inner {
            Cbor::Text(source) => Value::Regex(source),
            _ => return Err(CodecError::invalid_structure("regex tag must wrap text")),
        },
        Cbor::Tag(_, inner) => lift(*inner)?,
        _ => return Err(CodecError::unsupported_type("unknown CBOR item")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Array, Object};

    fn roundtrip(value: &Value) -> Value {
        decode(&encode(value).unwrap()).unwrap()
    }

    #[test]
    fn roundtrip_scalars() {
        for value in [
            Value::Null,
            Value::Undefined,
            Value::Bool(true),
            Value::from(42),
            Value::from(-7),
            Value::from(1.5),
            Value::from("hello world"),
            Value::Regex("^todo-\\d+$".into()),
        ] {
            assert_eq!(roundtrip(&value), value);
        }
    }

    #[test]
    fn roundtrip_date_keeps_millis() {
        let value = Value::date_from_millis(1_700_000_000_123).unwrap();
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn nan_survives_as_float() {
        let decoded = roundtrip(&Value::Number(f64::NAN));
        assert!(decoded.as_number().unwrap().is_nan());
    }

    #[test]
    fn roundtrip_nested_keeps_key_order() {
        let value = Value::object([
            (
                "todos",
                Value::array([
                    Value::object([("title", Value::from("a")), ("done", Value::from(false))]),
                    Value::object([("title", Value::from("b")), ("done", Value::from(true))]),
                ]),
            ),
            ("count", Value::from(2)),
            ("missing", Value::Undefined),
        ]);
        let decoded = roundtrip(&value);
        assert_eq!(decoded, value);
        let keys: Vec<&String> = decoded.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["todos", "count", "missing"]);
    }

    #[test]
    fn shared_but_acyclic_is_encoded_twice() {
        let shared = Value::object([("x", 1)]);
        let value = Value::object([("a", shared.clone()), ("b", shared)]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn cyclic_object_is_rejected() {
        let object = Object::cyclic(|this| {
            let mut entries = Map::new();
            entries.insert("self".into(), Value::Object(this.clone()));
            entries
        });
        let err = encode(&Value::Object(object)).unwrap_err();
        assert_eq!(err, CodecError::Cycle { path: "self".into() });
    }

    #[test]
    fn cyclic_array_is_rejected() {
        let array = Array::cyclic(|this| vec![Value::Array(this.clone())]);
        assert!(matches!(
            encode(&Value::Array(array)),
            Err(CodecError::Cycle { .. })
        ));
    }

    #[test]
    fn byte_strings_are_unsupported() {
        let mut bytes = Vec::new();
        ciborium::into_writer(&Cbor::Bytes(vec![1, 2]), &mut bytes).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(CodecError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            decode(&[0xff, 0x00]),
            Err(CodecError::DecodingFailed { .. })
        ));
    }
}
