//! Immutable application of change records.
//!
//! Every container on the path from the root to the target location is
//! shallow-copied before it is changed. Containers off the path are shared
//! with the input, so unchanged sections keep their identity.

use crate::error::{PatchError, PatchResult};
use crate::record::{ChangeRecord, ItemChange};
use storesync_value::{Array, Object, Path, PathSegment, Value};
use tracing::trace;

/// Applies `records` in order to `base` and returns the resulting value.
///
/// `base` is never modified. The first record that does not fit aborts the
/// whole application.
pub fn apply_change_records(records: &[ChangeRecord], base: &Value) -> PatchResult<Value> {
    let result = records
        .iter()
        .try_fold(base.clone(), |current, record| apply_change(&current, record))?;
    trace!(records = records.len(), "change records applied");
    Ok(result)
}

/// Applies a single record to `target` and returns the resulting value.
pub fn apply_change(target: &Value, record: &ChangeRecord) -> PatchResult<Value> {
    match record {
        ChangeRecord::Edited { path, next, .. } | ChangeRecord::Created { path, next } => {
            write(target, path, 0, Write::Set(next.clone()))
        }
        ChangeRecord::Deleted { path, .. } => write(target, path, 0, Write::Remove),
        ChangeRecord::ArrayItem { path, index, item } => {
            let array = array_at(target, path)?;
            let mut items = array.to_vec();
            let len = items.len();
            let out_of_bounds = || PatchError::IndexOutOfBounds {
                path: path.clone(),
                index: *index,
                len,
            };
            match item {
                ItemChange::Deleted { .. } => {
                    if *index >= len {
                        return Err(out_of_bounds());
                    }
                    items.remove(*index);
                }
                ItemChange::Created { next } | ItemChange::Edited { next, .. } => {
                    if *index < len {
                        items[*index] = next.clone();
                    } else if *index == len {
                        items.push(next.clone());
                    } else {
                        return Err(out_of_bounds());
                    }
                }
            }
            write(target, path, 0, Write::Set(Value::Array(Array::new(items))))
        }
    }
}

fn array_at<'a>(target: &'a Value, path: &Path) -> PatchResult<&'a Array> {
    let found = target
        .get_path(path)
        .ok_or_else(|| PatchError::PathNotFound {
            path: path.clone(),
            missing: path.clone(),
        })?;
    found.as_array().ok_or_else(|| PatchError::NotAnArray {
        path: path.clone(),
        kind: found.kind(),
    })
}

enum Write {
    Set(Value),
    Remove,
}

fn prefix(path: &Path, depth: usize) -> Path {
    path.segments()[..depth].iter().cloned().collect()
}

// Rebuilds `node` with the location `path[depth..]` changed.
fn write(node: &Value, path: &Path, depth: usize, op: Write) -> PatchResult<Value> {
    let segments = path.segments();
    let Some(segment) = segments.get(depth) else {
        return Ok(match op {
            Write::Set(value) => value,
            Write::Remove => Value::Undefined,
        });
    };
    let last = depth + 1 == segments.len();

    match (node, segment) {
        (Value::Object(object), PathSegment::Key(key)) => {
            let mut entries = object.to_map();
            if last {
                match op {
                    Write::Set(value) => {
                        entries.insert(key.clone(), value);
                    }
                    Write::Remove => {
                        if entries.shift_remove(key).is_none() {
                            return Err(PatchError::PathNotFound {
                                path: path.clone(),
                                missing: path.clone(),
                            });
                        }
                    }
                }
            } else {
                let child = object.get(key).ok_or_else(|| PatchError::PathNotFound {
                    path: path.clone(),
                    missing: prefix(path, depth + 1),
                })?;
                let updated = write(child, path, depth + 1, op)?;
                entries.insert(key.clone(), updated);
            }
            Ok(Value::Object(Object::new(entries)))
        }
        (Value::Array(array), PathSegment::Index(index)) => {
            let mut items = array.to_vec();
            let len = items.len();
            let out_of_bounds = || PatchError::IndexOutOfBounds {
                path: prefix(path, depth),
                index: *index,
                len,
            };
            if last {
                match op {
                    Write::Set(value) if *index < len => items[*index] = value,
                    Write::Set(value) if *index == len => items.push(value),
                    Write::Remove if *index < len => {
                        items.remove(*index);
                    }
                    _ => return Err(out_of_bounds()),
                }
            } else {
                let child = items.get(*index).ok_or_else(out_of_bounds)?;
                let updated = write(child, path, depth + 1, op)?;
                items[*index] = updated;
            }
            Ok(Value::Array(Array::new(items)))
        }
        (Value::Object(_) | Value::Array(_), _) => Err(PatchError::SegmentMismatch {
            path: path.clone(),
            at: prefix(path, depth),
            kind: node.kind(),
        }),
        _ => Err(PatchError::NotAContainer {
            path: path.clone(),
            at: prefix(path, depth),
            kind: node.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;

    fn state() -> Value {
        Value::object([
            (
                "todos",
                Value::array([
                    Value::object([("title", Value::from("a")), ("done", Value::from(false))]),
                    Value::object([("title", Value::from("b")), ("done", Value::from(true))]),
                ]),
            ),
            ("ui", Value::object([("modal", Value::Null)])),
            ("count", Value::from(2)),
        ])
    }

    #[test]
    fn edit_leaf() {
        let base = state();
        let record = ChangeRecord::Edited {
            path: Path::root().key("todos").index(0).key("done"),
            previous: Value::from(false),
            next: Value::from(true),
        };
        let next = apply_change(&base, &record).unwrap();
        assert_eq!(
            next.get_path(&Path::root().key("todos").index(0).key("done")),
            Some(&Value::from(true))
        );
        // Input untouched.
        assert_eq!(
            base.get_path(&Path::root().key("todos").index(0).key("done")),
            Some(&Value::from(false))
        );
    }

    #[test]
    fn off_path_containers_are_shared() {
        let base = state();
        let record = ChangeRecord::Edited {
            path: Path::root().key("todos").index(0).key("done"),
            previous: Value::from(false),
            next: Value::from(true),
        };
        let next = apply_change(&base, &record).unwrap();

        assert!(next.get("ui").unwrap().same_ref(base.get("ui").unwrap()));
        let second = Path::root().key("todos").index(1);
        assert!(next
            .get_path(&second)
            .unwrap()
            .same_ref(base.get_path(&second).unwrap()));
        assert!(!next.get("todos").unwrap().same_ref(base.get("todos").unwrap()));
        assert!(!next.same_ref(&base));
    }

    #[test]
    fn delete_removes_key_and_keeps_order() {
        let base = state();
        let record = ChangeRecord::Deleted {
            path: Path::root().key("ui"),
            previous: Value::Null,
        };
        let next = apply_change(&base, &record).unwrap();
        let keys: Vec<&String> = next.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["todos", "count"]);
    }

    #[test]
    fn created_inserts_key() {
        let record = ChangeRecord::Created {
            path: Path::root().key("ui").key("toast"),
            next: Value::from("saved"),
        };
        let next = apply_change(&state(), &record).unwrap();
        assert_eq!(
            next.get_path(&Path::root().key("ui").key("toast")),
            Some(&Value::from("saved"))
        );
    }

    #[test]
    fn array_item_delete_shifts() {
        let base = Value::object([("list", Value::array([1, 2, 3]))]);
        let record = ChangeRecord::ArrayItem {
            path: Path::root().key("list"),
            index: 0,
            item: ItemChange::Deleted {
                previous: Value::from(1),
            },
        };
        let next = apply_change(&base, &record).unwrap();
        assert_eq!(next.get("list"), Some(&Value::array([2, 3])));
    }

    #[test]
    fn array_item_created_appends_or_replaces() {
        let base = Value::array([1, 2]);
        let append = ChangeRecord::ArrayItem {
            path: Path::root(),
            index: 2,
            item: ItemChange::Created { next: Value::from(3) },
        };
        assert_eq!(apply_change(&base, &append).unwrap(), Value::array([1, 2, 3]));

        let replace = ChangeRecord::ArrayItem {
            path: Path::root(),
            index: 0,
            item: ItemChange::Edited {
                previous: Value::from(1),
                next: Value::from(9),
            },
        };
        assert_eq!(apply_change(&base, &replace).unwrap(), Value::array([9, 2]));
    }

    #[test]
    fn root_records() {
        let edited = ChangeRecord::Edited {
            path: Path::root(),
            previous: Value::from(1),
            next: Value::from("x"),
        };
        assert_eq!(apply_change(&Value::from(1), &edited).unwrap(), Value::from("x"));

        let deleted = ChangeRecord::Deleted {
            path: Path::root(),
            previous: Value::from(1),
        };
        assert_eq!(
            apply_change(&Value::from(1), &deleted).unwrap(),
            Value::Undefined
        );
    }

    #[test]
    fn shrinking_array_round_trips() {
        let a = Value::object([("list", Value::array([1, 2, 3, 4, 5]))]);
        let b = Value::object([("list", Value::array([9, 2]))]);
        let next = apply_change_records(&diff(&a, &b), &a).unwrap();
        assert_eq!(next, b);
    }

    #[test]
    fn missing_intermediate_is_an_error() {
        let record = ChangeRecord::Edited {
            path: Path::root().key("nope").key("deeper"),
            previous: Value::Null,
            next: Value::from(1),
        };
        let err = apply_change(&state(), &record).unwrap_err();
        assert_eq!(
            err,
            PatchError::PathNotFound {
                path: Path::root().key("nope").key("deeper"),
                missing: Path::root().key("nope"),
            }
        );
    }

    #[test]
    fn deleting_missing_key_is_an_error() {
        let record = ChangeRecord::Deleted {
            path: Path::root().key("ghost"),
            previous: Value::Null,
        };
        assert!(matches!(
            apply_change(&state(), &record),
            Err(PatchError::PathNotFound { .. })
        ));
    }

    #[test]
    fn stale_array_index_is_an_error() {
        let record = ChangeRecord::ArrayItem {
            path: Path::root().key("todos"),
            index: 5,
            item: ItemChange::Deleted {
                previous: Value::Null,
            },
        };
        assert_eq!(
            apply_change(&state(), &record).unwrap_err(),
            PatchError::IndexOutOfBounds {
                path: Path::root().key("todos"),
                index: 5,
                len: 2,
            }
        );
    }

    #[test]
    fn scalar_in_path_is_an_error() {
        let record = ChangeRecord::Edited {
            path: Path::root().key("count").key("inner"),
            previous: Value::Null,
            next: Value::from(1),
        };
        assert!(matches!(
            apply_change(&state(), &record),
            Err(PatchError::NotAContainer { .. })
        ));
    }

    #[test]
    fn wrong_segment_type_is_an_error() {
        let record = ChangeRecord::Edited {
            path: Path::root().key("todos").key("0"),
            previous: Value::Null,
            next: Value::from(1),
        };
        assert!(matches!(
            apply_change(&state(), &record),
            Err(PatchError::SegmentMismatch { .. })
        ));
    }

    #[test]
    fn array_item_on_object_is_an_error() {
        let record = ChangeRecord::ArrayItem {
            path: Path::root().key("ui"),
            index: 0,
            item: ItemChange::Created { next: Value::Null },
        };
        assert!(matches!(
            apply_change(&state(), &record),
            Err(PatchError::NotAnArray { .. })
        ));
    }
}
