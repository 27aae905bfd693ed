//! Change selection over top-level state sections.
//!
//! A store that follows the "new reference only for modified sections"
//! convention tells us which sections changed for free. Only those sections
//! are worth diffing.

use crate::diff::diff;
use crate::record::ChangeRecord;
use storesync_value::{Map, Value};

/// The changed sections of two state snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialStates {
    /// Changed sections as they were before.
    pub previous: Value,
    /// Changed sections as they are now.
    pub next: Value,
}

/// Keeps only the top-level sections whose reference changed.
///
/// A section present on one side only is kept on that side. When either
/// snapshot is not an object the snapshots are returned whole.
pub fn select_partial(previous: &Value, next: &Value) -> PartialStates {
    let (Value::Object(before), Value::Object(after)) = (previous, next) else {
        return PartialStates {
            previous: previous.clone(),
            next: next.clone(),
        };
    };

    let mut previous_part = Map::new();
    let mut next_part = Map::new();
    if !before.ptr_eq(after) {
        for (key, a) in before.iter() {
            match after.get(key) {
                Some(b) if a.same_ref(b) => {}
                Some(b) => {
                    previous_part.insert(key.clone(), a.clone());
                    next_part.insert(key.clone(), b.clone());
                }
                None => {
                    previous_part.insert(key.clone(), a.clone());
                }
            }
        }
        for (key, b) in after.iter() {
            if !before.contains_key(key) {
                next_part.insert(key.clone(), b.clone());
            }
        }
    }

    PartialStates {
        previous: Value::from(previous_part),
        next: Value::from(next_part),
    }
}

/// Diffs only the sections whose reference changed.
pub fn diff_changed_sections(previous: &Value, next: &Value) -> Vec<ChangeRecord> {
    let partial = select_partial(previous, next);
    diff(&partial.previous, &partial.next)
}

/// Projects `state` onto the top-level sections accepted by `keep`.
///
/// Section order follows `state`. A non-object state projects to an empty
/// object.
pub fn pick_sections<F>(state: &Value, keep: F) -> Value
where
    F: Fn(&str) -> bool,
{
    let picked: Map = state
        .as_object()
        .map(|object| {
            object
                .iter()
                .filter(|(key, _)| keep(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();
    Value::from(picked)
}
