//! Wire form of change records.
//!
//! | Record      | Fields                                   |
//! |-------------|------------------------------------------|
//! | `Edited`    | `kind: "E"`, `path`, `lhs`, `rhs`        |
//! | `Created`   | `kind: "N"`, `path`, `rhs`               |
//! | `Deleted`   | `kind: "D"`, `path`, `lhs`               |
//! | `ArrayItem` | `kind: "A"`, `path`, `index`, `item`     |
//!
//! `path` is an array of strings (object keys) and numbers (array indices).
//! `item` is an object with its own `kind` and `lhs`/`rhs`.

use crate::error::{ProtocolError, ProtocolResult};
use storesync_diff::{ChangeRecord, ItemChange};
use storesync_value::{Map, Path, PathSegment, Value};

/// Encodes change records as a value.
pub fn records_to_value(records: &[ChangeRecord]) -> Value {
    Value::array(records.iter().map(record_to_value))
}

/// Decodes change records from a value.
pub fn records_from_value(value: &Value) -> ProtocolResult<Vec<ChangeRecord>> {
    let items = value
        .as_array()
        .ok_or_else(|| ProtocolError::invalid_record(0, "differences must be an array"))?;
    items
        .iter()
        .enumerate()
        .map(|(position, item)| record_from_value(position, item))
        .collect()
}

fn path_to_value(path: &Path) -> Value {
    Value::array(path.iter().map(|segment| match segment {
        PathSegment::Key(key) => Value::Text(key.clone()),
        #[allow(clippy::cast_precision_loss)]
        PathSegment::Index(index) => Value::Number(*index as f64),
    }))
}

fn record_to_value(record: &ChangeRecord) -> Value {
    let mut entries = Map::new();
    entries.insert("kind".into(), Value::from(record.kind_code()));
    entries.insert("path".into(), path_to_value(record.path()));
    match record {
        ChangeRecord::Edited { previous, next, .. } => {
            entries.insert("lhs".into(), previous.clone());
            entries.insert("rhs".into(), next.clone());
        }
        ChangeRecord::Created { next, .. } => {
            entries.insert("rhs".into(), next.clone());
        }
        ChangeRecord::Deleted { previous, .. } => {
            entries.insert("lhs".into(), previous.clone());
        }
        ChangeRecord::ArrayItem { index, item, .. } => {
            #[allow(clippy::cast_precision_loss)]
            entries.insert("index".into(), Value::Number(*index as f64));
            entries.insert("item".into(), item_to_value(item));
        }
    }
    Value::from(entries)
}

fn item_to_value(item: &ItemChange) -> Value {
    let mut entries = Map::new();
    entries.insert("kind".into(), Value::from(item.kind_code()));
    match item {
        ItemChange::Created { next } => {
            entries.insert("rhs".into(), next.clone());
        }
        ItemChange::Deleted { previous } => {
            entries.insert("lhs".into(), previous.clone());
        }
        ItemChange::Edited { previous, next } => {
            entries.insert("lhs".into(), previous.clone());
            entries.insert("rhs".into(), next.clone());
        }
    }
    Value::from(entries)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_index(value: &Value) -> Option<usize> {
    let n = value.as_number()?;
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn path_from_value(position: usize, value: Option<&Value>) -> ProtocolResult<Path> {
    let Some(Value::Array(segments)) = value else {
        return Err(ProtocolError::invalid_record(position, "path must be an array"));
    };
    segments
        .iter()
        .map(|segment| match segment {
            Value::Text(key) => Ok(PathSegment::Key(key.clone())),
            other => as_index(other).map(PathSegment::Index).ok_or_else(|| {
                ProtocolError::invalid_record(position, "path segments must be keys or indices")
            }),
        })
        .collect()
}

fn side(entry: Option<&Value>) -> Value {
    entry.cloned().unwrap_or(Value::Undefined)
}

fn record_from_value(position: usize, value: &Value) -> ProtocolResult<ChangeRecord> {
    let object = value
        .as_object()
        .ok_or_else(|| ProtocolError::invalid_record(position, "record must be an object"))?;
    let path = path_from_value(position, object.get("path"))?;
    let kind = object.get("kind").and_then(Value::as_text);

    Ok(match kind {
        Some("E") => ChangeRecord::Edited {
            path,
            previous: side(object.get("lhs")),
            next: side(object.get("rhs")),
        },
        Some("N") => ChangeRecord::Created {
            path,
            next: side(object.get("rhs")),
        },
        Some("D") => ChangeRecord::Deleted {
            path,
            previous: side(object.get("lhs")),
        },
        Some("A") => {
            let index = object
                .get("index")
                .and_then(as_index)
                .ok_or_else(|| ProtocolError::invalid_record(position, "missing array index"))?;
            let item = object
                .get("item")
                .and_then(Value::as_object)
                .ok_or_else(|| ProtocolError::invalid_record(position, "missing array item"))?;
            let item = match item.get("kind").and_then(Value::as_text) {
                Some("N") => ItemChange::Created {
                    next: side(item.get("rhs")),
                },
                Some("D") => ItemChange::Deleted {
                    previous: side(item.get("lhs")),
                },
                Some("E") => ItemChange::Edited {
                    previous: side(item.get("lhs")),
                    next: side(item.get("rhs")),
                },
                _ => {
                    return Err(ProtocolError::invalid_record(
                        position,
                        "unknown array item kind",
                    ))
                }
            };
            ChangeRecord::ArrayItem { path, index, item }
        }
        _ => return Err(ProtocolError::invalid_record(position, "unknown record kind")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use storesync_diff::diff;

    #[test]
    fn wire_shape_of_edit() {
        let records = vec![ChangeRecord::Edited {
            path: Path::root().key("todos").index(1).key("done"),
            previous: Value::from(false),
            next: Value::from(true),
        }];
        let value = records_to_value(&records);
        let first = value.as_array().unwrap().get(0).unwrap();
        assert_eq!(first.get("kind"), Some(&Value::from("E")));
        assert_eq!(
            first.get("path"),
            Some(&Value::array([Value::from("todos"), Value::from(1), Value::from("done")]))
        );
        assert_eq!(first.get("lhs"), Some(&Value::from(false)));
        assert_eq!(first.get("rhs"), Some(&Value::from(true)));
    }

    #[test]
    fn wire_shape_of_array_item() {
        let records = diff(&Value::array([1, 2]), &Value::array([1]));
        let value = records_to_value(&records);
        let first = value.as_array().unwrap().get(0).unwrap();
        assert_eq!(first.get("kind"), Some(&Value::from("A")));
        assert_eq!(first.get("index"), Some(&Value::from(1)));
        assert_eq!(
            first.get("item").and_then(|i| i.get("kind")),
            Some(&Value::from("D"))
        );
        assert_eq!(records_from_value(&value).unwrap(), records);
    }

    #[test]
    fn decodes_what_the_differ_emits() {
        let before = Value::object([
            ("a", Value::from(1)),
            ("gone", Value::Undefined),
            ("list", Value::array([1, 2, 3])),
        ]);
        let after = Value::object([
            ("a", Value::from("one")),
            ("list", Value::array([1])),
            ("new", Value::object([("deep", true)])),
        ]);
        let records = diff(&before, &after);
        let decoded = records_from_value(&records_to_value(&records)).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn rejects_unknown_kind() {
        let value = Value::array([Value::object([
            ("kind", Value::from("X")),
            ("path", Value::array(Vec::<Value>::new())),
        ])]);
        assert_eq!(
            records_from_value(&value).unwrap_err(),
            ProtocolError::invalid_record(0, "unknown record kind")
        );
    }

    #[test]
    fn rejects_negative_index_segment() {
        let value = Value::array([Value::object([
            ("kind", Value::from("N")),
            ("path", Value::array([-1])),
            ("rhs", Value::from(1)),
        ])]);
        assert!(matches!(
            records_from_value(&value),
            Err(ProtocolError::InvalidRecord { position: 0, .. })
        ));
    }

    #[test]
    fn rejects_non_array_differences() {
        assert!(records_from_value(&Value::empty_object()).is_err());
    }
}
