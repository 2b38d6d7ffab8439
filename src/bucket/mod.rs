//! Bucket Module
//!
//! In-memory image of every bucket in the store.
//!
//! ## Responsibilities
//! - Hold named key→record maps in sorted order
//! - Apply logged operations (from live commits and WAL replay)
//! - Ordered iteration for snapshot creation
//!
//! Buckets serve two regimes with the same structure: node-private buckets
//! named by a node id, and shared collections named by a key prefix.

mod table;

use std::collections::BTreeMap;

pub use table::BucketTable;

/// A single bucket: key → encoded record
pub type Bucket = BTreeMap<String, Vec<u8>>;
