//! Transactions
//!
//! Read transactions borrow a consistent view of the bucket table. Write
//! transactions stage operations against that view; the engine commits the
//! staged batch only when the transaction closure succeeds.

use std::collections::BTreeSet;

use parking_lot::RwLockReadGuard;

use crate::bucket::{Bucket, BucketTable};
use crate::error::{MpdbError, Result};
use crate::record::{self, Scalar};
use crate::wal::Operation;

// =============================================================================
// Read Transactions
// =============================================================================

/// A read-only transaction
pub struct ReadTxn<'a> {
    table: RwLockReadGuard<'a, BucketTable>,
}

impl<'a> ReadTxn<'a> {
    pub(crate) fn new(table: RwLockReadGuard<'a, BucketTable>) -> Self {
        Self { table }
    }

    /// Open an existing bucket; reads never create buckets
    pub fn bucket<'t>(&'t self, name: &'t str) -> Result<ReadBucket<'t>> {
        match self.table.get(name) {
            Some(inner) => Ok(ReadBucket { name, inner }),
            None => Err(MpdbError::Bucket(format!("Bucket {} does not exist", name))),
        }
    }
}

/// A bucket opened inside a read transaction
pub struct ReadBucket<'t> {
    name: &'t str,
    inner: &'t Bucket,
}

impl<'t> ReadBucket<'t> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// Decode one key; absent keys are `Ok(None)`
    pub fn get(&self, key: &str) -> Result<Option<Scalar>> {
        record::decode_lookup(self.inner.get(key).map(|v| v.as_slice()))
    }

    /// Decode every key in sorted order
    pub fn scan(&self) -> Result<Vec<(String, Option<Scalar>)>> {
        self.inner
            .iter()
            .map(|(key, value)| Ok((key.clone(), record::decode_lookup(Some(value.as_slice()))?)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// =============================================================================
// Write Transactions
// =============================================================================

/// A writable transaction
pub struct WriteTxn<'a> {
    table: RwLockReadGuard<'a, BucketTable>,
    /// Buckets this transaction already opened (or created)
    opened: BTreeSet<String>,
    /// Staged mutations, committed as one WAL entry
    operations: Vec<Operation>,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(table: RwLockReadGuard<'a, BucketTable>) -> Self {
        Self {
            table,
            opened: BTreeSet::new(),
            operations: Vec::new(),
        }
    }

    /// Fetch a bucket, creating it if it does not exist
    pub fn bucket(&mut self, name: &str) -> Result<WriteBucket<'_, 'a>> {
        if name.is_empty() {
            return Err(MpdbError::Bucket("Bucket name required".to_string()));
        }

        if !self.opened.contains(name) {
            if !self.table.contains(name) {
                self.operations.push(Operation::CreateBucket {
                    bucket: name.to_string(),
                });
            }
            self.opened.insert(name.to_string());
        }

        Ok(WriteBucket {
            name: name.to_string(),
            tx: self,
        })
    }

    /// Number of staged operations
    pub fn pending(&self) -> usize {
        self.operations.len()
    }

    /// Finish staging; releases the shared view
    pub(crate) fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

/// A bucket opened inside a write transaction
pub struct WriteBucket<'t, 'a> {
    name: String,
    tx: &'t mut WriteTxn<'a>,
}

impl<'t, 'a> WriteBucket<'t, 'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overwrite a key (last write wins)
    pub fn put(&mut self, key: &str, value: &Scalar) -> Result<()> {
        if key.is_empty() {
            return Err(MpdbError::Bucket(format!(
                "Key required for bucket {}",
                self.name
            )));
        }

        self.tx.operations.push(Operation::Put {
            bucket: self.name.clone(),
            key: key.to_string(),
            value: record::encode(value),
        });
        Ok(())
    }
}
