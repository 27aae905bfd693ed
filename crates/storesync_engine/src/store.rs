//! Dispatch collaborator: stores, reducers, and side effects.

use crate::error::SyncResult;
use parking_lot::RwLock;
use std::sync::Arc;
use storesync_protocol::Action;
use storesync_value::Value;
use tracing::trace;

/// Options for a single dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Suppresses side effects for this dispatch.
    pub skip_hooks: bool,
    /// Reduces the action against this state instead of the current one.
    pub base_state: Option<Value>,
}

impl DispatchOptions {
    /// Options that suppress side effects.
    pub fn skip_hooks() -> Self {
        Self {
            skip_hooks: true,
            base_state: None,
        }
    }

    /// Options that reduce against `state`.
    pub fn with_base_state(state: Value) -> Self {
        Self {
            skip_hooks: false,
            base_state: Some(state),
        }
    }
}

/// Outcome of a dispatch.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    /// Whether `next_state` is a different reference than `previous_state`.
    pub state_changed: bool,
    /// The state the action was reduced against.
    pub previous_state: Value,
    /// The state after the action.
    pub next_state: Value,
}

/// Computes the next state for an action.
pub trait Reducer: Send + Sync {
    /// Reduces `action` against `state`.
    ///
    /// Sections the action does not touch should be returned as the same
    /// references.
    fn reduce(&self, state: &Value, action: &Action) -> SyncResult<Value>;
}

impl<F> Reducer for F
where
    F: Fn(&Value, &Action) -> Value + Send + Sync,
{
    fn reduce(&self, state: &Value, action: &Action) -> SyncResult<Value> {
        Ok(self(state, action))
    }
}

/// Runs after a dispatch unless the dispatch skipped hooks.
pub type SideEffect = Arc<dyn Fn(&Action, &DispatchResult) + Send + Sync>;

/// A state container that reduces actions.
pub trait Store: Send + Sync {
    /// Returns the current state.
    fn state(&self) -> Value;

    /// Dispatches an action with options.
    fn dispatch_with(&self, action: &Action, options: DispatchOptions) -> SyncResult<DispatchResult>;

    /// Installs a side effect that runs after every hooked dispatch.
    fn add_side_effect(&self, effect: SideEffect);

    /// Dispatches an action.
    fn dispatch(&self, action: &Action) -> SyncResult<DispatchResult> {
        self.dispatch_with(action, DispatchOptions::default())
    }
}

/// An in-memory store.
pub struct MemoryStore<R: Reducer> {
    reducer: R,
    state: RwLock<Value>,
    side_effects: RwLock<Vec<SideEffect>>,
}

impl<R: Reducer> MemoryStore<R> {
    /// Creates a store with an initial state.
    pub fn new(reducer: R, initial: Value) -> Self {
        Self {
            reducer,
            state: RwLock::new(initial),
            side_effects: RwLock::new(Vec::new()),
        }
    }

    /// Returns the reducer.
    pub fn reducer(&self) -> &R {
        &self.reducer
    }
}

impl<R: Reducer> Store for MemoryStore<R> {
    fn state(&self) -> Value {
        self.state.read().clone()
    }

    fn dispatch_with(&self, action: &Action, options: DispatchOptions) -> SyncResult<DispatchResult> {
        let result = {
            let mut state = self.state.write();
            let previous_state = options.base_state.unwrap_or_else(|| state.clone());
            let next_state = self.reducer.reduce(&previous_state, action)?;
            *state = next_state.clone();
            DispatchResult {
                state_changed: !next_state.same_ref(&previous_state),
                previous_state,
                next_state,
            }
        };
        trace!(
            action = action.action_type().unwrap_or("<untyped>"),
            changed = result.state_changed,
            "dispatched"
        );

        if !options.skip_hooks {
            let effects = self.side_effects.read().clone();
            for effect in effects {
                effect(action, &result);
            }
        }
        Ok(result)
    }

    fn add_side_effect(&self, effect: SideEffect) {
        self.side_effects.write().push(effect);
    }
}
