//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;

use super::reader::Frame;
use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first partial or corrupted entry
    /// 3. Truncate the file there
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, mut result, valid_len) = Self::scan(path, true)?;

        let file_len = std::fs::metadata(path)?.len();
        if valid_len < file_len {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
            result.was_truncated = true;
            tracing::warn!(
                "WAL {} truncated from {} to {} bytes",
                path.display(),
                file_len,
                valid_len
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, mut result, valid_len) = Self::scan(path, false)?;
        result.was_truncated = valid_len < std::fs::metadata(path)?.len();
        Ok(result)
    }

    fn scan(path: &Path, keep: bool) -> Result<(Vec<WalEntry>, RecoveryResult, u64)> {
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_frame()? {
                Frame::Entry(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    if keep {
                        entries.push(entry);
                    }
                }
                Frame::End => break,
                Frame::Torn => {
                    tracing::debug!("Partial WAL entry at offset {}", reader.position());
                    break;
                }
                Frame::Corrupt(e) => {
                    tracing::warn!("Corrupted WAL entry at offset {}: {}", reader.position(), e);
                    result.entries_corrupted += 1;
                    break;
                }
            }
        }

        Ok((entries, result, reader.position()))
    }
}
