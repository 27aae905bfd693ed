//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use storesync_value::{Map, Value};

/// Create a nested object `depth` levels deep with `width` keys per level.
pub fn nested(depth: usize, width: usize, leaf: i32) -> Value {
    if depth == 0 {
        return Value::from(leaf);
    }
    let entries: Map = (0..width)
        .map(|i| (format!("key_{}", i), nested(depth - 1, width, leaf)))
        .collect();
    Value::from(entries)
}

/// Create a store-like state with `sections` sections of `items` todos each.
pub fn store_state(sections: usize, items: usize) -> Value {
    let entries: Map = (0..sections)
        .map(|s| {
            let list: Vec<Value> = (0..items)
                .map(|i| Value::object([("id", Value::from(i as i32)), ("done", Value::from(false))]))
                .collect();
            (format!("section_{}", s), Value::array(list))
        })
        .collect();
    Value::from(entries)
}

/// Replace `section_0`, keeping the other sections by reference.
pub fn touch_one_section(state: &Value) -> Value {
    let mut entries = state.as_object().map(|o| o.to_map()).unwrap_or_default();
    entries.insert("section_0".into(), Value::array([Value::from("changed")]));
    Value::from(entries)
}
