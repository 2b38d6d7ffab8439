//! Engine Module
//!
//! The transactional bucket store that coordinates all storage components.
//!
//! ## Responsibilities
//! - Coordinate WAL, the in-memory bucket table and snapshots
//! - Run read and write transactions with all-or-nothing commits
//! - Checkpoint when the WAL grows past its threshold
//! - Manage crash recovery on startup

mod collections;
mod txn;

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::bucket::BucketTable;
use crate::config::Config;
use crate::error::Result;
use crate::storage::{SnapshotBuilder, SnapshotReader};
use crate::wal::{WalRecovery, WalWriter};

pub use collections::{node_bucket, route_key, DataMap, ResultMap, GLOBAL_BUCKET};
pub use txn::{ReadBucket, ReadTxn, WriteBucket, WriteTxn};

/// The storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Write transactions**: serialized by `write_lock`
///   - Stage operations while holding a shared view of the table
///   - Commit order: WAL append → table write lock → apply
///   - A closure that fails stages nothing durable (rollback)
///
/// - **Read transactions**: shared lock on the table for their duration,
///   so they never observe half of a commit
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Location of the checkpoint file
    snapshot_path: PathBuf,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Every bucket in the store
    buckets: RwLock<BucketTable>,

    /// Serializes write transactions and checkpoints
    write_lock: Mutex<()>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SNAPSHOT_FILENAME: &'static str = "snapshot.db";
    const SNAPSHOT_TMP_FILENAME: &'static str = "snapshot.db.tmp";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Load the last snapshot if one exists
    /// 3. Replay WAL entries newer than the snapshot
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let snapshot_path = config.data_dir.join(Self::SNAPSHOT_FILENAME);

        let (mut table, snapshot_lsn) = if snapshot_path.exists() {
            let snapshot = SnapshotReader::load(&snapshot_path)?;
            tracing::info!(
                "Loaded snapshot with {} entries up to LSN {}",
                snapshot.entry_count,
                snapshot.last_lsn
            );
            (snapshot.table, snapshot.last_lsn)
        } else {
            (BucketTable::new(), 0)
        };

        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;

            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    "WAL recovery: {} entries recovered, {} corrupted, last_lsn={}",
                    recovery.entries_recovered,
                    recovery.entries_corrupted,
                    recovery.last_lsn
                );
            }

            // Entries at or below the snapshot LSN are already folded in
            for entry in entries.iter().filter(|e| e.lsn > snapshot_lsn) {
                table.apply_all(&entry.operations);
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        wal.advance_lsn(snapshot_lsn + 1);

        tracing::debug!(
            "Engine opened at {} with {} buckets",
            config.data_dir.display(),
            table.len()
        );

        Ok(Self {
            config,
            snapshot_path,
            wal: Mutex::new(wal),
            buckets: RwLock::new(table),
            write_lock: Mutex::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Run a read transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTxn<'_>) -> Result<T>,
    {
        let tx = ReadTxn::new(self.buckets.read());
        f(&tx)
    }

    /// Run a write transaction
    ///
    /// Every operation staged by `f` becomes durable and visible together,
    /// or not at all when `f` returns an error.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T>,
    {
        let _write_guard = self.write_lock.lock();

        let mut tx = WriteTxn::new(self.buckets.read());
        let value = f(&mut tx)?;
        let operations = tx.into_operations();

        if operations.is_empty() {
            return Ok(value);
        }

        let wal_size = {
            let mut wal = self.wal.lock();
            let lsn = wal.append(operations.clone())?;
            tracing::trace!("Committed {} operations at LSN {}", operations.len(), lsn);
            wal.size()
        };

        self.buckets.write().apply_all(&operations);

        // The transaction is durable at this point; a failed checkpoint
        // leaves the WAL intact and is retried on the next commit.
        if wal_size >= self.config.checkpoint_threshold {
            if let Err(e) = self.checkpoint_internal() {
                tracing::warn!("Checkpoint after commit failed: {}", e);
            }
        }

        Ok(value)
    }

    /// Write a snapshot of every bucket and truncate the WAL
    pub fn checkpoint(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.checkpoint_internal()
    }

    /// Internal checkpoint implementation (called with write lock held)
    fn checkpoint_internal(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        let last_lsn = wal.current_lsn() - 1;

        let tmp_path = self.config.data_dir.join(Self::SNAPSHOT_TMP_FILENAME);
        let mut builder = SnapshotBuilder::new(&tmp_path)?;
        builder.add_table(&self.buckets.read())?;
        let entries = builder.finish(last_lsn)?;

        fs::rename(&tmp_path, &self.snapshot_path)?;
        wal.truncate()?;

        tracing::info!("Checkpoint: {} entries up to LSN {}", entries, last_lsn);
        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Checkpoints so the next open does not need to replay the WAL
    pub fn close(self) -> Result<()> {
        self.checkpoint()?;
        self.wal.lock().sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the snapshot file path
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Get the number of buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }

    /// Get all bucket names
    pub fn bucket_names(&self) -> Vec<String> {
        self.buckets.read().names()
    }

    /// Get the current WAL size in bytes
    pub fn wal_size(&self) -> u64 {
        self.wal.lock().size()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
