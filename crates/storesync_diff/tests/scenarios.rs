//! Diff, patch, and selection working together on store-shaped values.

use storesync_diff::{
    apply_change_records, diff, diff_changed_sections, select_partial, ChangeRecord, ItemChange,
    PatchError,
};
use storesync_testkit::{add_todo, todo_reducer, todo_state, toggle_todo, UI_SECTION};
use storesync_value::{Map, Object, Path, Value};

#[test]
fn removing_a_middle_element() {
    let before = Value::object([("list", Value::array([1, 2, 3]))]);
    let after = Value::object([("list", Value::array([1, 3]))]);

    let records = diff(&before, &after);
    assert_eq!(
        records,
        vec![
            ChangeRecord::Edited {
                path: Path::root().key("list").index(1),
                previous: Value::from(2),
                next: Value::from(3),
            },
            ChangeRecord::ArrayItem {
                path: Path::root().key("list"),
                index: 2,
                item: ItemChange::Deleted {
                    previous: Value::from(3),
                },
            },
        ]
    );
    assert_eq!(apply_change_records(&records, &before).unwrap(), after);
}

#[test]
fn shrinking_by_several_elements_replays_in_order() {
    let before = Value::array([1, 2, 3, 4, 5]);
    let after = Value::array([1]);
    let records = diff(&before, &after);
    let indices: Vec<usize> = records
        .iter()
        .filter_map(|r| match r {
            ChangeRecord::ArrayItem { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![4, 3, 2, 1]);
    assert_eq!(apply_change_records(&records, &before).unwrap(), after);
}

#[test]
fn self_referential_values_terminate() {
    let build = |n: i32| {
        Value::Object(Object::cyclic(move |this| {
            let mut entries = Map::new();
            entries.insert("self".into(), Value::Object(this.clone()));
            entries.insert("n".into(), Value::from(n));
            entries
        }))
    };
    let a = build(1);
    let b = build(2);

    assert!(diff(&a, &a).is_empty());
    let records = diff(&a, &b);
    assert!(records.iter().any(|r| r.path() == &Path::root().key("n")));
}

#[test]
fn reducer_output_round_trips_through_records() {
    let start = todo_state();
    let next = [add_todo("a"), add_todo("b"), toggle_todo(0)]
        .iter()
        .fold(start.clone(), |state, action| todo_reducer(&state, action));

    let records = diff_changed_sections(&start, &next);
    let patched = apply_change_records(&records, &start).unwrap();
    assert_eq!(patched, next);
    assert!(records.iter().all(|r| r.section() != Some(UI_SECTION)));
    assert!(patched
        .get(UI_SECTION)
        .unwrap()
        .same_ref(start.get(UI_SECTION).unwrap()));
}

#[test]
fn selection_skips_sections_with_unchanged_identity() {
    let start = todo_state();
    let next = todo_reducer(&start, &add_todo("a"));
    let partial = select_partial(&start, &next);

    let previous = partial.previous.as_object().unwrap();
    let selected = partial.next.as_object().unwrap();
    assert!(!selected.contains_key(UI_SECTION));
    assert!(selected.contains_key("todos"));
    assert!(selected.contains_key("stats"));
    assert!(!previous.contains_key(UI_SECTION));
}

#[test]
fn records_for_a_different_base_fail() {
    let records = diff(
        &Value::object([("todos", Value::array([1, 2, 3]))]),
        &Value::object([("todos", Value::array([1]))]),
    );
    let err = apply_change_records(&records, &todo_state()).unwrap_err();
    assert!(matches!(err, PatchError::IndexOutOfBounds { .. }));
    assert_eq!(err.path(), &Path::root().key("todos"));
}

#[test]
fn patch_leaves_base_untouched() {
    let base = todo_state();
    let snapshot = todo_state();
    let next = todo_reducer(&base, &add_todo("a"));
    let _ = apply_change_records(&diff(&base, &next), &base).unwrap();
    assert_eq!(base, snapshot);
}
