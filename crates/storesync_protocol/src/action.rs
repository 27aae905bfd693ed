//! Actions and reserved action types.

use storesync_value::{Map, Object, Value};

/// Type of the envelope carrying change records to the host.
pub const SYNC_FOR_CLIENT_STORE: &str = "SYNC_FOR_CLIENT_STORE";

/// Type of the envelope carrying a forwarded action to the worker.
pub const SYNC_FOR_WORKER_STORE: &str = "SYNC_FOR_WORKER_STORE";

/// Type of the bootstrap action the host sends to start the handshake.
pub const INIT_ACTION_TYPE: &str = "STORESYNC_INIT";

/// Field marking an action for immediate delivery.
pub const PRIORITY_FIELD: &str = "priority";

const TYPE_FIELD: &str = "type";

/// Returns true for action types owned by the sync protocol.
///
/// Reserved types are never forwarded as ordinary actions.
pub fn is_reserved_type(action_type: &str) -> bool {
    matches!(
        action_type,
        SYNC_FOR_CLIENT_STORE | SYNC_FOR_WORKER_STORE | INIT_ACTION_TYPE
    )
}

/// A store action: an object with a string `type` and arbitrary payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Action(Object);

impl Action {
    /// Creates an action with the given type and no payload.
    pub fn new(action_type: impl Into<String>) -> Self {
        let mut entries = Map::new();
        entries.insert(TYPE_FIELD.to_string(), Value::Text(action_type.into()));
        Self(Object::new(entries))
    }

    /// Creates the bootstrap action.
    pub fn init() -> Self {
        Self::new(INIT_ACTION_TYPE)
    }

    /// Wraps an object value. Returns `None` for anything else.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned().map(Self)
    }

    /// Returns this action with `key` set to `value`.
    #[must_use]
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut entries = self.0.to_map();
        entries.insert(key.into(), value.into());
        Self(Object::new(entries))
    }

    /// Returns this action marked for immediate delivery.
    #[must_use]
    pub fn prioritized(self) -> Self {
        self.with(PRIORITY_FIELD, true)
    }

    /// Returns the action type, if the action has a string `type`.
    pub fn action_type(&self) -> Option<&str> {
        self.0.get(TYPE_FIELD).and_then(Value::as_text)
    }

    /// Looks up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true if the action bypasses outgoing batching.
    pub fn is_priority(&self) -> bool {
        self.0.get(PRIORITY_FIELD).and_then(Value::as_bool) == Some(true)
    }

    /// Returns true if the action type is reserved by the protocol.
    pub fn is_reserved(&self) -> bool {
        self.action_type().is_some_and(is_reserved_type)
    }

    /// Returns true for the bootstrap action.
    pub fn is_init(&self) -> bool {
        self.action_type() == Some(INIT_ACTION_TYPE)
    }

    /// Returns the action as a value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Action> for Value {
    fn from(action: Action) -> Self {
        Value::Object(action.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let action = Action::new("todos/add").with("title", "write docs");
        assert_eq!(action.action_type(), Some("todos/add"));
        assert_eq!(action.get("title"), Some(&Value::from("write docs")));
        assert!(!action.is_priority());
        assert!(action.prioritized().is_priority());
    }

    #[test]
    fn reserved_types() {
        assert!(is_reserved_type(SYNC_FOR_CLIENT_STORE));
        assert!(is_reserved_type(SYNC_FOR_WORKER_STORE));
        assert!(is_reserved_type(INIT_ACTION_TYPE));
        assert!(!is_reserved_type("todos/add"));
        assert!(Action::init().is_reserved());
        assert!(Action::init().is_init());
    }

    #[test]
    fn untyped_actions() {
        let action = Action::from_value(&Value::empty_object()).unwrap();
        assert_eq!(action.action_type(), None);
        assert!(!action.is_reserved());

        let numeric = Action::from_value(&Value::object([("type", 3)])).unwrap();
        assert_eq!(numeric.action_type(), None);

        assert!(Action::from_value(&Value::from("nope")).is_none());
    }

    #[test]
    fn priority_must_be_true() {
        let action = Action::new("x").with(PRIORITY_FIELD, "yes");
        assert!(!action.is_priority());
    }
}
