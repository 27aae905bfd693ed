//! Protocol states and statistics.

use crate::error::SyncError;
use parking_lot::RwLock;
use tracing::warn;

/// State of the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    /// Waiting for the first full sync from the worker.
    AwaitingHandshake,
    /// The first full sync has been applied.
    Synced,
}

impl HostState {
    /// Returns true once the handshake has completed.
    pub fn is_synced(&self) -> bool {
        matches!(self, HostState::Synced)
    }
}

/// State of the worker side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No message from the host yet.
    Idle,
    /// The host has been heard from.
    Running,
}

impl WorkerState {
    /// Returns true once the host has been heard from.
    pub fn is_running(&self) -> bool {
        matches!(self, WorkerState::Running)
    }
}

/// Statistics about sync traffic on one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Envelopes sent to the peer.
    pub envelopes_sent: u64,
    /// Sync envelopes received from the peer.
    pub envelopes_received: u64,
    /// Messages ignored because they were not sync envelopes for this side.
    pub messages_ignored: u64,
    /// Change records applied to local state.
    pub records_applied: u64,
    /// Change records produced from local dispatches.
    pub records_produced: u64,
    /// Sections dropped because they were outside the allow-list.
    pub sections_dropped: u64,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Statistics that are only kept when enabled.
pub(crate) struct StatsRecorder {
    enabled: bool,
    stats: RwLock<SyncStats>,
}

impl StatsRecorder {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            stats: RwLock::new(SyncStats::default()),
        }
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut SyncStats)) {
        if self.enabled {
            f(&mut self.stats.write());
        }
    }

    /// Logs an error that has no caller to return to.
    pub(crate) fn error(&self, error: &SyncError) {
        warn!(error = %error, desync = error.is_desync(), "sync error");
        self.update(|stats| stats.last_error = Some(error.to_string()));
    }

    pub(crate) fn snapshot(&self) -> SyncStats {
        self.stats.read().clone()
    }
}
