//! Property-based test generators using proptest.
//!
//! Values produced here are acyclic and free of `NaN`, so structural
//! equality is a meaningful oracle for them.

use proptest::prelude::*;
use storesync_protocol::Action;
use storesync_value::{Map, Value};

/// Strategy for object keys and section names.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9_]{0,7}").expect("Invalid regex")
}

/// Strategy for dates between 1970 and roughly 2096, at millisecond precision.
pub fn date_strategy() -> impl Strategy<Value = Value> {
    (0i64..4_000_000_000_000).prop_map(|millis| {
        Value::date_from_millis(millis).expect("millis in range")
    })
}

/// Strategy for scalar values, excluding `NaN`.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        (-1.0e9f64..1.0e9).prop_map(Value::Number),
        prop::string::string_regex("[ -~]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
        date_strategy(),
        prop::string::string_regex("[a-z.*+]{1,6}")
            .expect("Invalid regex")
            .prop_map(Value::Regex),
    ]
}

/// Strategy for arbitrary nested values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::array),
            prop::collection::vec((key_strategy(), inner), 0..6).prop_map(object_from_pairs),
        ]
    })
}

/// Strategy for store states: an object of top-level sections.
pub fn state_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec((key_strategy(), value_strategy()), 0..6).prop_map(object_from_pairs)
}

/// Strategy for a pair of states where `next` shares some sections with
/// `previous` by reference and replaces or adds others.
pub fn evolved_state_strategy() -> impl Strategy<Value = (Value, Value)> {
    (
        state_strategy(),
        prop::collection::vec(any::<bool>(), 6),
        prop::collection::vec((key_strategy(), value_strategy()), 0..3),
    )
        .prop_map(|(previous, keep, added)| {
            let mut sections = Map::new();
            if let Some(object) = previous.as_object() {
                for ((key, value), keep) in object.iter().zip(keep) {
                    if keep {
                        sections.insert(key.clone(), value.clone());
                    }
                }
            }
            for (key, value) in added {
                sections.insert(key, value);
            }
            (previous, Value::from(sections))
        })
}

/// Strategy for ordinary (non-reserved) actions.
pub fn action_strategy() -> impl Strategy<Value = Action> {
    (
        prop::string::string_regex("[a-z]{1,8}/[a-z]{1,8}").expect("Invalid regex"),
        prop::option::of(scalar_strategy()),
        any::<bool>(),
    )
        .prop_map(|(action_type, payload, priority)| {
            let mut action = Action::new(action_type);
            if let Some(payload) = payload {
                action = action.with("payload", payload);
            }
            if priority {
                action = action.prioritized();
            }
            action
        })
}

fn object_from_pairs(pairs: Vec<(String, Value)>) -> Value {
    let entries: Map = pairs.into_iter().collect();
    Value::from(entries)
}
