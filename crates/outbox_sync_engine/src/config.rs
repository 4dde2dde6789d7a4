//! Configuration for the sync engine.

use std::time::Duration;

/// Default address of the remote authority.
pub const DEFAULT_REMOTE_URL: &str = "http://127.0.0.1:3000";

/// Configuration for talking to the remote authority.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the remote authority.
    pub remote_url: String,
    /// Bound on each remote call. Expiry counts as a remote failure.
    pub remote_timeout: Duration,
    /// Bound on a connectivity probe.
    pub probe_timeout: Duration,
    /// How often a watcher probes connectivity.
    pub poll_interval: Duration,
}

impl SyncConfig {
    /// Creates a configuration for the authority at `remote_url`.
    pub fn new(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            remote_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Sets the remote call timeout.
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Sets the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the connectivity poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REMOTE_URL)
    }
}
