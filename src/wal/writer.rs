//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{MpdbError, Result};

use super::{Operation, WalEntry, WalReader};

/// Writes entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// LSN the next appended entry receives
    next_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries written since the last fsync
    uncommitted: usize,
    /// Current file size in bytes
    size: u64,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// Existing entries are scanned to continue the LSN sequence. Run
    /// recovery first if the file may end in a partial write.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let size = file.metadata()?.len();

        let mut last_lsn = 0;
        if size > 0 {
            let mut reader = WalReader::open(path)?;
            while let Some(entry) = reader.next_entry()? {
                last_lsn = entry.lsn;
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            next_lsn: last_lsn + 1,
            sync_strategy,
            uncommitted: 0,
            size,
        })
    }

    /// Append one transaction to the WAL, returning its LSN
    ///
    /// If writing or syncing the frame fails, the file is cut back to its
    /// previous length so the entry cannot be replayed later.
    pub fn append(&mut self, operations: Vec<Operation>) -> Result<u64> {
        let lsn = self.next_lsn;
        let frame = WalEntry::new(lsn, operations).serialize()?;

        if let Err(e) = self.write_frame(&frame) {
            if let Err(rollback) = self.rollback() {
                tracing::error!(
                    "WAL {} rollback of LSN {} failed: {}",
                    self.path.display(),
                    lsn,
                    rollback
                );
            }
            return Err(MpdbError::WalWrite(format!("LSN {}: {}", lsn, e)));
        }

        self.next_lsn += 1;
        self.size += frame.len() as u64;
        Ok(lsn)
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.writer.write_all(frame)?;
        self.writer.flush()?;

        let pending = self.uncommitted + 1;
        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => pending >= count,
        };
        if due {
            self.sync()?;
        } else {
            self.uncommitted = pending;
        }
        Ok(())
    }

    /// Discard anything past the last good entry
    ///
    /// The buffered writer is swapped out without flushing, so a failed
    /// frame still sitting in its buffer is dropped too.
    fn rollback(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)?;
        let failed = std::mem::replace(&mut self.writer, BufWriter::new(file));
        let (_file, _unwritten) = failed.into_parts();

        let file = self.writer.get_ref();
        file.set_len(self.size)?;
        file.sync_all()?;
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Discard every entry (after a checkpoint made them durable elsewhere)
    ///
    /// LSNs keep increasing across truncations.
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.sync_all()?;
        self.size = 0;
        self.uncommitted = 0;
        Ok(())
    }

    /// Get the LSN the next entry will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Continue numbering from at least `lsn`
    pub fn advance_lsn(&mut self, lsn: u64) {
        self.next_lsn = self.next_lsn.max(lsn);
    }

    /// Entries written since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    /// Current size of the log in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
