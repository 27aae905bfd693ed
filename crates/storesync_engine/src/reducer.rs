//! Host-side reducer wrapper that applies change records from the worker.

use crate::error::SyncResult;
use crate::store::Reducer;
use storesync_diff::apply_change_records;
use storesync_protocol::{Action, Envelope, SYNC_FOR_CLIENT_STORE};
use storesync_value::Value;

/// Wraps a reducer with the synthetic `SYNC_FOR_CLIENT_STORE` case.
///
/// A sync action carries the envelope fields of a worker message. Its change
/// records are applied to the state in order. Every other action goes to the
/// wrapped reducer.
#[derive(Debug, Clone)]
pub struct ClientReducer<R> {
    inner: R,
}

impl<R: Reducer> ClientReducer<R> {
    /// Wraps `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns the wrapped reducer.
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: Reducer> Reducer for ClientReducer<R> {
    fn reduce(&self, state: &Value, action: &Action) -> SyncResult<Value> {
        if action.action_type() != Some(SYNC_FOR_CLIENT_STORE) {
            return self.inner.reduce(state, action);
        }
        match Envelope::from_message(&action.to_value())? {
            Some(Envelope::SyncForClient(envelope)) => {
                Ok(apply_change_records(&envelope.differences, state)?)
            }
            _ => Ok(state.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use storesync_diff::diff;
    use storesync_protocol::SyncForClient;

    fn base(state: &Value, action: &Action) -> Value {
        match action.action_type() {
            Some("reset") => Value::empty_object(),
            _ => state.clone(),
        }
    }

    fn sync_action(envelope: SyncForClient) -> Action {
        Action::from_value(&Envelope::from(envelope).to_message()).unwrap()
    }

    #[test]
    fn applies_records() {
        let before = Value::object([("count", 1)]);
        let after = Value::object([("count", 2)]);
        let reducer = ClientReducer::new(base);
        let action = sync_action(SyncForClient::new(diff(&before, &after)));
        assert_eq!(reducer.reduce(&before, &action).unwrap(), after);
    }

    #[test]
    fn delegates_other_actions() {
        let reducer = ClientReducer::new(base);
        let state = Value::object([("count", 1)]);
        assert_eq!(
            reducer.reduce(&state, &Action::new("reset")).unwrap(),
            Value::empty_object()
        );
        assert!(reducer
            .reduce(&state, &Action::new("other"))
            .unwrap()
            .same_ref(&state));
    }

    #[test]
    fn stale_records_are_loud() {
        let reducer = ClientReducer::new(base);
        let records = diff(
            &Value::object([("list", Value::array([1, 2, 3]))]),
            &Value::object([("list", Value::array([1]))]),
        );
        let action = sync_action(SyncForClient::new(records));
        let err = reducer
            .reduce(&Value::object([("list", Value::array([1]))]), &action)
            .unwrap_err();
        assert!(matches!(err, SyncError::Patch(_)));
    }
}
