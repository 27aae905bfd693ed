//! Configuration for the sync engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default quiet period of the outgoing batcher.
pub const DEFAULT_BATCH_QUIET_PERIOD: Duration = Duration::from_millis(100);

/// Configuration shared by the host and worker sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Top-level sections the host owns and forwards to the worker.
    ///
    /// The worker accepts only these sections from the host. Empty means
    /// the host forwards actions with an empty partial state.
    pub client_sections: Vec<String>,
    /// Inactivity window after which batched records are flushed.
    #[serde(with = "millis", rename = "batchQuietPeriodMs")]
    pub batch_quiet_period: Duration,
    /// Whether sync statistics are collected.
    pub collect_stats: bool,
}

impl SyncConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self {
            client_sections: Vec::new(),
            batch_quiet_period: DEFAULT_BATCH_QUIET_PERIOD,
            collect_stats: true,
        }
    }

    /// Sets the client-owned sections.
    pub fn with_client_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.client_sections = sections.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one client-owned section.
    pub fn with_client_section(mut self, section: impl Into<String>) -> Self {
        self.client_sections.push(section.into());
        self
    }

    /// Sets the batch quiet period.
    pub fn with_batch_quiet_period(mut self, period: Duration) -> Self {
        self.batch_quiet_period = period;
        self
    }

    /// Enables or disables statistics.
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.collect_stats = enabled;
        self
    }

    /// Returns true if `section` is owned by the host.
    pub fn is_client_section(&self, section: &str) -> bool {
        self.client_sections.iter().any(|s| s == section)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
