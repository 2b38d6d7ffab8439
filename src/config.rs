//! Configuration for mpdb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MpdbError, Result};

/// Main configuration for an mpdb instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── snapshot.db      (last checkpoint of every bucket)
    pub data_dir: PathBuf,

    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// WAL size (in bytes) after which the engine checkpoints
    pub checkpoint_threshold: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// UDP listen address
    pub listen_addr: String,

    /// Receive buffer size for a single datagram
    pub max_datagram_size: usize,

    /// Socket read timeout (milliseconds); the dispatch loop checks for
    /// shutdown and sweeps idle sessions at this cadence
    pub poll_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Session Configuration
    // -------------------------------------------------------------------------
    /// Number of echo tags a session buffers ahead of its window
    pub window_size: u64,

    /// Period of the per-session resend timer (milliseconds)
    pub resend_interval_ms: u64,

    /// Evict sessions that have been silent this long (milliseconds).
    /// `None` keeps sessions for the process lifetime.
    pub session_idle_timeout_ms: Option<u64>,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./mpdb_data"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            checkpoint_threshold: 64 * 1024 * 1024, // 64 MB
            listen_addr: "[::]:7000".to_string(),
            max_datagram_size: 4096,
            poll_interval_ms: 500,
            window_size: 5,
            resend_interval_ms: 3000,
            session_idle_timeout_ms: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the session and dispatch loops cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(MpdbError::Config("window_size must be at least 1".to_string()));
        }
        if self.resend_interval_ms == 0 {
            return Err(MpdbError::Config("resend_interval_ms must be positive".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(MpdbError::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.max_datagram_size == 0 {
            return Err(MpdbError::Config("max_datagram_size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn resend_interval(&self) -> Duration {
        Duration::from_millis(self.resend_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn session_idle_timeout(&self) -> Option<Duration> {
        self.session_idle_timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the WAL size that triggers a checkpoint (in bytes)
    pub fn checkpoint_threshold(mut self, bytes: u64) -> Self {
        self.config.checkpoint_threshold = bytes;
        self
    }

    /// Set the UDP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the receive buffer size (in bytes)
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.config.max_datagram_size = size;
        self
    }

    /// Set the socket poll interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the per-session window size
    pub fn window_size(mut self, size: u64) -> Self {
        self.config.window_size = size;
        self
    }

    /// Set the resend interval (in milliseconds)
    pub fn resend_interval_ms(mut self, ms: u64) -> Self {
        self.config.resend_interval_ms = ms;
        self
    }

    /// Set the idle eviction timeout (in milliseconds)
    pub fn session_idle_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.config.session_idle_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
