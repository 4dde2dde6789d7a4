//! Local store configuration.

/// Configuration for opening the local stores.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to sync each append to disk before returning.
    pub sync_on_write: bool,

    /// Dead frames that trigger automatic compaction (once they also
    /// outnumber live keys).
    pub compact_threshold: usize,

    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            compact_threshold: 256,
            create_if_missing: true,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether each append is synced.
    #[must_use]
    pub const fn with_sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the compaction threshold. Zero is treated as one.
    #[must_use]
    pub const fn with_compact_threshold(mut self, frames: usize) -> Self {
        self.compact_threshold = if frames == 0 { 1 } else { frames };
        self
    }

    /// Sets whether a missing store directory is created.
    #[must_use]
    pub const fn with_create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }
}
