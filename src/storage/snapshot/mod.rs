//! Snapshot Module
//!
//! Writing and loading checkpoint files.

mod builder;
mod reader;

use std::path::PathBuf;

pub use builder::SnapshotBuilder;
pub use reader::SnapshotReader;

use crate::bucket::BucketTable;

// =============================================================================
// Shared Constants (used by builder and reader)
// =============================================================================

/// Magic bytes identifying an mpdb snapshot file
pub(crate) const MAGIC: &[u8; 4] = b"MPDB";

/// Current snapshot format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) = 14 bytes
pub(crate) const HEADER_SIZE: u64 = 14;

/// Footer size: LastLSN (8) + DataCRC (4) + Padding (4) = 16 bytes
pub(crate) const FOOTER_SIZE: u64 = 16;

/// Per-entry length prefix: BucketLen (4) + KeyLen (4) + ValLen (4)
pub(crate) const ENTRY_PREFIX_SIZE: usize = 12;

/// Sentinel value indicating a bucket with no keys
pub(crate) const EMPTY_BUCKET_MARKER: u32 = u32::MAX;

/// A loaded snapshot
#[derive(Debug)]
pub struct Snapshot {
    /// Path the snapshot was read from
    pub path: PathBuf,

    /// Every bucket as of the checkpoint
    pub table: BucketTable,

    /// Last WAL LSN folded into this snapshot
    pub last_lsn: u64,

    /// Number of entries (keys plus empty-bucket markers)
    pub entry_count: u64,
}
