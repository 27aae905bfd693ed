//! Host side of the sync protocol.

use crate::channel::MessageChannel;
use crate::config::SyncConfig;
use crate::deferred::Deferred;
use crate::error::{SyncError, SyncResult};
use crate::state::{HostState, StatsRecorder, SyncStats};
use crate::store::{DispatchOptions, DispatchResult, Store};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use storesync_diff::pick_sections;
use storesync_protocol::{is_reserved_type, Action, Envelope, ProtocolError, SyncForWorker};
use storesync_value::Value;
use tracing::{debug, trace};

/// The host side of a host/worker store pair.
///
/// Construction installs two hooks:
/// - a side effect on the store that forwards every typed, non-reserved
///   action to the worker together with the client-owned sections of the
///   post-dispatch state
/// - a handler on the channel that applies `SYNC_FOR_CLIENT_STORE` records
///   to the store without re-triggering forwarding
///
/// The store's reducer must be wrapped in
/// [`ClientReducer`](crate::ClientReducer) so that the synthetic sync action
/// applies its records.
pub struct HostSync<S: Store + 'static, C: MessageChannel + 'static> {
    inner: Arc<HostInner<S, C>>,
}

struct HostInner<S, C> {
    store: Arc<S>,
    channel: Arc<C>,
    config: SyncConfig,
    handshake: Deferred,
    state: RwLock<HostState>,
    stats: StatsRecorder,
}

impl<S: Store + 'static, C: MessageChannel + 'static> Clone for HostSync<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store + 'static, C: MessageChannel + 'static> HostSync<S, C> {
    /// Attaches the host protocol to `store` and `channel`.
    pub fn new(store: Arc<S>, channel: Arc<C>, config: SyncConfig) -> Self {
        let inner = Arc::new(HostInner {
            store,
            channel,
            stats: StatsRecorder::new(config.collect_stats),
            config,
            handshake: Deferred::new(),
            state: RwLock::new(HostState::AwaitingHandshake),
        });

        let weak = Arc::downgrade(&inner);
        inner
            .store
            .add_side_effect(Arc::new(move |action: &Action, result: &DispatchResult| {
                if let Some(inner) = weak.upgrade() {
                    inner.forward(action, result);
                }
            }));

        let weak: Weak<HostInner<S, C>> = Arc::downgrade(&inner);
        inner.channel.on_message(Arc::new(move |message: Value| {
            if let Some(inner) = weak.upgrade() {
                if let Err(err) = inner.handle_message(&message) {
                    inner.stats.error(&err);
                }
            }
        }));

        Self { inner }
    }

    /// Sends the bootstrap action that asks the worker for a full sync.
    pub fn bootstrap(&self) -> SyncResult<()> {
        let inner = &self.inner;
        let partial = inner.client_sections(&inner.store.state());
        inner.send(SyncForWorker::new(partial, Action::init()))?;
        debug!("bootstrap sent");
        Ok(())
    }

    /// Dispatches a local action. Typed, non-reserved actions are forwarded.
    pub fn dispatch(&self, action: &Action) -> SyncResult<DispatchResult> {
        self.inner.store.dispatch(action)
    }

    /// Processes a message from the worker.
    ///
    /// Messages that are not `SYNC_FOR_CLIENT_STORE` envelopes are ignored.
    pub fn handle_message(&self, message: &Value) -> SyncResult<()> {
        self.inner.handle_message(message)
    }

    /// Runs `continuation` once the first full sync has been applied.
    pub fn after_handshake(&self, continuation: impl FnOnce() + Send + 'static) {
        self.inner.handshake.then(continuation);
    }

    /// Dispatches `action` once the first full sync has been applied.
    pub fn dispatch_after_handshake(&self, action: Action) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.handshake.then(move || {
            if let Some(inner) = weak.upgrade() {
                if let Err(err) = inner.store.dispatch(&action) {
                    inner.stats.error(&err);
                }
            }
        });
    }

    /// Waits until the first full sync has been applied.
    pub async fn handshake_complete(&self) {
        self.inner.handshake.wait().await;
    }

    /// Returns the protocol state.
    pub fn sync_state(&self) -> HostState {
        *self.inner.state.read()
    }

    /// Returns the current store state.
    pub fn state(&self) -> Value {
        self.inner.store.state()
    }

    /// Returns the sync statistics.
    pub fn stats(&self) -> SyncStats {
        self.inner.stats.snapshot()
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

impl<S: Store, C: MessageChannel> HostInner<S, C> {
    fn client_sections(&self, state: &Value) -> Value {
        pick_sections(state, |section| self.config.is_client_section(section))
    }

    fn send(&self, envelope: SyncForWorker) -> SyncResult<()> {
        self.channel.send(Envelope::from(envelope).to_message())?;
        self.stats.update(|stats| stats.envelopes_sent += 1);
        Ok(())
    }

    fn forward(&self, action: &Action, result: &DispatchResult) {
        let Some(action_type) = action.action_type() else {
            return;
        };
        if is_reserved_type(action_type) {
            return;
        }
        let partial = self.client_sections(&result.next_state);
        match self.send(SyncForWorker::new(partial, action.clone())) {
            Ok(()) => trace!(action = action_type, "forwarded to worker"),
            Err(err) => self.stats.error(&err),
        }
    }

    fn handle_message(&self, message: &Value) -> SyncResult<()> {
        let envelope = match Envelope::from_message(message)? {
            Some(Envelope::SyncForClient(envelope)) => envelope,
            Some(other) => {
                debug!(message_type = other.type_name(), "ignoring envelope for the worker");
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

        let action = Action::from_value(message).ok_or(ProtocolError::NotAnEnvelope)?;
        let records = envelope.differences.len();
        let result = self
            .store
            .dispatch_with(&action, DispatchOptions::skip_hooks())?;
        if records > 0 && !result.state_changed {
            return Err(SyncError::SyncActionIgnored);
        }
        self.stats
            .update(|stats| stats.records_applied += records as u64);
        trace!(records, init = envelope.is_init_action, "applied worker records");

        if envelope.is_init_action {
            *self.state.write() = HostState::Synced;
            if self.handshake.resolve() {
                debug!("handshake complete");
            }
        }
        Ok(())
    }
}
