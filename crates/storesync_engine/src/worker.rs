//! Worker side of the sync protocol.

use crate::batcher::OutgoingBatcher;
use crate::channel::MessageChannel;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::state::{StatsRecorder, SyncStats, WorkerState};
use crate::store::{DispatchOptions, DispatchResult, Store};
use parking_lot::RwLock;
use std::sync::Arc;
use storesync_diff::{apply_change_records, diff, diff_changed_sections, pick_sections};
use storesync_protocol::{Action, Envelope, SyncForClient};
use storesync_value::{Map, Value};
use tracing::{debug, trace, warn};

/// The worker side of a host/worker store pair.
///
/// The worker owns the canonical state. Construction installs a side effect
/// on the store that diffs the changed sections of every dispatch and hands
/// the records to an [`OutgoingBatcher`], and a channel handler that merges
/// forwarded client sections and reduces forwarded actions.
///
/// Priority actions bypass batching; their records are sent right away,
/// after anything already pending.
pub struct WorkerSync<S: Store + 'static, C: MessageChannel + 'static> {
    inner: Arc<WorkerInner<S, C>>,
}

struct WorkerInner<S, C: MessageChannel> {
    store: Arc<S>,
    batcher: OutgoingBatcher<C>,
    config: SyncConfig,
    state: RwLock<WorkerState>,
    stats: StatsRecorder,
}

impl<S: Store + 'static, C: MessageChannel + 'static> Clone for WorkerSync<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store + 'static, C: MessageChannel + 'static> WorkerSync<S, C> {
    /// Attaches the worker protocol to `store` and `channel`.
    pub fn new(store: Arc<S>, channel: Arc<C>, config: SyncConfig) -> Self {
        let batcher = OutgoingBatcher::new(Arc::clone(&channel), config.batch_quiet_period);
        let inner = Arc::new(WorkerInner {
            store,
            batcher,
            stats: StatsRecorder::new(config.collect_stats),
            config,
            state: RwLock::new(WorkerState::Idle),
        });

        let weak = Arc::downgrade(&inner);
        inner
            .store
            .add_side_effect(Arc::new(move |action: &Action, result: &DispatchResult| {
                if let Some(inner) = weak.upgrade() {
                    inner.publish(action, result);
                }
            }));

        let weak = Arc::downgrade(&inner);
        channel.on_message(Arc::new(move |message: Value| {
            if let Some(inner) = weak.upgrade() {
                if let Err(err) = inner.handle_message(&message) {
                    inner.stats.error(&err);
                }
            }
        }));

        Self { inner }
    }

    /// Dispatches an action that originates in the worker.
    pub fn dispatch(&self, action: &Action) -> SyncResult<DispatchResult> {
        self.inner.store.dispatch(action)
    }

    /// Processes a message from the host.
    ///
    /// Messages that are not `SYNC_FOR_WORKER_STORE` envelopes are ignored.
    pub fn handle_message(&self, message: &Value) -> SyncResult<()> {
        self.inner.handle_message(message)
    }

    /// Sends pending batched records now. Returns the number of records sent.
    pub fn flush(&self) -> SyncResult<usize> {
        self.inner.batcher.flush_now()
    }

    /// Returns the protocol state.
    pub fn sync_state(&self) -> WorkerState {
        *self.inner.state.read()
    }

    /// Returns the current store state.
    pub fn state(&self) -> Value {
        self.inner.store.state()
    }

    /// Returns the sync statistics.
    pub fn stats(&self) -> SyncStats {
        let mut stats = self.inner.stats.snapshot();
        if self.inner.config.collect_stats {
            stats.envelopes_sent = self.inner.batcher.envelopes_sent();
        }
        stats
    }

    /// Returns the outgoing batcher.
    pub fn batcher(&self) -> &OutgoingBatcher<C> {
        &self.inner.batcher
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }
}

impl<S: Store, C: MessageChannel + 'static> WorkerInner<S, C> {
    fn publish(&self, action: &Action, result: &DispatchResult) {
        if action.is_init() {
            return;
        }
        let records = diff_changed_sections(&result.previous_state, &result.next_state);
        if records.is_empty() {
            return;
        }
        let count = records.len() as u64;
        self.stats.update(|stats| stats.records_produced += count);

        let outcome = if action.is_priority() {
            self.batcher
                .send_immediately(SyncForClient::new(records).with_action(action.clone()))
        } else {
            self.batcher.enqueue(records).map(drop)
        };
        if let Err(err) = outcome {
            self.stats.error(&err);
        }
    }

    // Keeps only allow-listed sections of a forwarded partial state.
    fn accept_sections(&self, partial: &Value) -> Value {
        let Some(object) = partial.as_object() else {
            return Value::empty_object();
        };
        let mut accepted = Map::new();
        let mut dropped = Vec::new();
        for (section, value) in object.iter() {
            if self.config.is_client_section(section) {
                accepted.insert(section.clone(), value.clone());
            } else {
                dropped.push(section.as_str());
            }
        }
        if !dropped.is_empty() {
            warn!(sections = ?dropped, "dropping sections outside the client allow-list");
            let count = dropped.len() as u64;
            self.stats.update(|stats| stats.sections_dropped += count);
        }
        Value::from(accepted)
    }

    fn handle_message(&self, message: &Value) -> SyncResult<()> {
        let envelope = match Envelope::from_message(message)? {
            Some(Envelope::SyncForWorker(envelope)) => envelope,
            Some(other) => {
                debug!(message_type = other.type_name(), "ignoring envelope for the host");
                self.stats.update(|stats| stats.messages_ignored += 1);
                return Ok(());
            }
            None => {
                trace!("ignoring non-sync message");
                self.stats.update(|stats| stats.messages_ignored += 1);
                return Ok(());
            }
        };
        self.stats.update(|stats| stats.envelopes_received += 1);
        *self.state.write() = WorkerState::Running;

        let incoming = self.accept_sections(&envelope.partial_state);
        let local = self.store.state();
        let local_sections = pick_sections(&local, |section| self.config.is_client_section(section));
        let merge = diff(&local_sections, &incoming);
        let merged = apply_change_records(&merge, &local)?;
        let merged_records = merge.len() as u64;
        self.stats
            .update(|stats| stats.records_applied += merged_records);

        let action = envelope.action;
        if action.is_init() {
            self.store
                .dispatch_with(&action, DispatchOptions::with_base_state(merged))?;
            let full = diff(&Value::empty_object(), &self.store.state());
            debug!(records = full.len(), "sending initial full sync");
            self.batcher.send_immediately(SyncForClient::init(full))?;
            return Ok(());
        }
        if action.action_type().is_none() || action.is_reserved() {
            warn!(action = ?action.action_type(), "ignoring forwarded action without a usable type");
            return Ok(());
        }
        self.store
            .dispatch_with(&action, DispatchOptions::with_base_state(merged))?;
        Ok(())
    }
}
