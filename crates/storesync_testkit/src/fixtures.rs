//! Test fixtures: a small todo application and host/worker wiring.

use std::sync::Arc;
use storesync_engine::{
    ClientReducer, HostSync, LoopbackChannel, MemoryStore, SyncConfig, WorkerSync,
};
use storesync_protocol::Action;
use storesync_value::{Map, Value};

/// Section owned by the host in the todo fixture.
pub const UI_SECTION: &str = "ui";

/// Initial state of the todo fixture.
///
/// `todos` and `stats` are canonical worker sections, `ui` is owned by
/// the host.
pub fn todo_state() -> Value {
    Value::object([
        ("todos", Value::array(Vec::<Value>::new())),
        ("stats", Value::object([("added", 0)])),
        (UI_SECTION, Value::object([("filter", "all")])),
    ])
}

/// Creates an action adding a todo.
pub fn add_todo(title: &str) -> Action {
    Action::new("todos/add").with("title", title)
}

/// Creates an action toggling the todo at `index`.
pub fn toggle_todo(index: u32) -> Action {
    Action::new("todos/toggle").with("index", index)
}

/// Creates an action setting the UI filter.
pub fn set_filter(filter: &str) -> Action {
    Action::new("ui/filter").with("filter", filter)
}

fn with_section(state: &Value, section: &str, value: Value) -> Value {
    let mut entries = state.as_object().map(|o| o.to_map()).unwrap_or_default();
    entries.insert(section.to_string(), value);
    Value::from(entries)
}

/// Reducer of the todo fixture.
///
/// Untouched sections keep their references.
pub fn todo_reducer(state: &Value, action: &Action) -> Value {
    match action.action_type() {
        Some("todos/add") => {
            let title = action.get("title").cloned().unwrap_or(Value::Null);
            let mut todos = state
                .get("todos")
                .and_then(Value::as_array)
                .map(|a| a.to_vec())
                .unwrap_or_default();
            todos.push(Value::object([("title", title), ("done", Value::from(false))]));
            let added = state
                .get("stats")
                .and_then(|s| s.get("added"))
                .and_then(Value::as_number)
                .unwrap_or(0.0);
            let state = with_section(state, "todos", Value::array(todos));
            with_section(&state, "stats", Value::object([("added", added + 1.0)]))
        }
        Some("todos/toggle") => {
            let Some(index) = action
                .get("index")
                .and_then(Value::as_number)
                .map(|n| n as usize)
            else {
                return state.clone();
            };
            let Some(todos) = state.get("todos").and_then(Value::as_array) else {
                return state.clone();
            };
            let Some(todo) = todos.get(index).and_then(Value::as_object) else {
                return state.clone();
            };
            let done = todo.get("done").and_then(Value::as_bool).unwrap_or(false);
            let mut entries: Map = todo.to_map();
            entries.insert("done".into(), Value::from(!done));
            let mut items = todos.to_vec();
            items[index] = Value::from(entries);
            with_section(state, "todos", Value::array(items))
        }
        Some("ui/filter") => {
            let filter = action.get("filter").cloned().unwrap_or(Value::Null);
            with_section(state, UI_SECTION, Value::object([("filter", filter)]))
        }
        _ => state.clone(),
    }
}

/// Host-side reducer of the todo fixture.
///
/// The host only reduces its own section. Everything else arrives from the
/// worker as change records.
pub fn host_reducer(state: &Value, action: &Action) -> Value {
    match action.action_type() {
        Some("ui/filter") => todo_reducer(state, action),
        _ => state.clone(),
    }
}

/// Store type used on the host side of the fixture.
pub type HostStore = MemoryStore<ClientReducer<fn(&Value, &Action) -> Value>>;

/// Store type used on the worker side of the fixture.
pub type WorkerStore = MemoryStore<fn(&Value, &Action) -> Value>;

/// A host and a worker connected by a loopback channel.
pub struct SyncPair {
    /// Host side.
    pub host: HostSync<HostStore, LoopbackChannel>,
    /// Worker side.
    pub worker: WorkerSync<WorkerStore, LoopbackChannel>,
    /// Host end of the channel.
    pub host_channel: Arc<LoopbackChannel>,
    /// Worker end of the channel.
    pub worker_channel: Arc<LoopbackChannel>,
}

impl SyncPair {
    /// Wires the todo fixture with `config` on both sides.
    ///
    /// The host starts with an empty-todo state; the worker starts from
    /// `worker_state`.
    pub fn new(config: SyncConfig, worker_state: Value) -> Self {
        let (host_end, worker_end) = LoopbackChannel::pair();
        let host_channel = Arc::new(host_end);
        let worker_channel = Arc::new(worker_end);

        let host_fn: fn(&Value, &Action) -> Value = host_reducer;
        let worker_fn: fn(&Value, &Action) -> Value = todo_reducer;
        let host_store = Arc::new(MemoryStore::new(ClientReducer::new(host_fn), todo_state()));
        let worker_store = Arc::new(MemoryStore::new(worker_fn, worker_state));

        let host = HostSync::new(host_store, Arc::clone(&host_channel), config.clone());
        let worker = WorkerSync::new(worker_store, Arc::clone(&worker_channel), config);
        Self {
            host,
            worker,
            host_channel,
            worker_channel,
        }
    }

    /// Wires the todo fixture with `ui` as the only client section.
    pub fn todo() -> Self {
        Self::new(
            SyncConfig::new().with_client_section(UI_SECTION),
            todo_state(),
        )
    }

    /// Delivers queued messages in both directions until both are idle.
    ///
    /// Returns the number of messages delivered.
    pub fn pump(&self) -> usize {
        let mut total = 0;
        loop {
            let delivered =
                self.worker_channel.deliver_pending() + self.host_channel.deliver_pending();
            if delivered == 0 {
                return total;
            }
            total += delivered;
        }
    }
}
