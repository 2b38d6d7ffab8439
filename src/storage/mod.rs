//! Storage Module
//!
//! Checkpoint files holding a full image of every bucket.
//!
//! The WAL alone would grow forever; once it passes the configured
//! threshold the engine writes a snapshot and truncates the log.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "MPDB" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [BucketLen: u32][KeyLen: u32][ValLen: u32]            │
//! │   [Bucket][Key][Value]                                  │
//! │   ... repeated for each entry ...                       │
//! │   (ValLen = u32::MAX marks an empty bucket, no key or   │
//! │    value bytes)                                         │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                       │
//! │   LastLSN: u64 (8) | DataCRC: u32 (4) | Padding (4)     │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod snapshot;

pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotReader};
