//! BucketTable implementation
//!
//! BTreeMap of buckets; the engine wraps it in a RwLock.

use std::collections::BTreeMap;

use crate::wal::Operation;

use super::Bucket;

/// Every bucket currently in the store
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BucketTable {
    buckets: BTreeMap<String, Bucket>,
}

impl BucketTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a bucket by name
    pub fn get(&self, name: &str) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    /// Create an empty bucket unless it already exists
    pub fn create_bucket(&mut self, name: &str) {
        if !self.buckets.contains_key(name) {
            self.buckets.insert(name.to_string(), Bucket::new());
        }
    }

    /// Overwrite a key, creating the bucket on demand
    pub fn put(&mut self, bucket: &str, key: String, value: Vec<u8>) {
        self.create_or_get(bucket).insert(key, value);
    }

    /// Apply a single logged operation
    pub fn apply(&mut self, operation: &Operation) {
        match operation {
            Operation::CreateBucket { bucket } => self.create_bucket(bucket),
            Operation::Put { bucket, key, value } => {
                self.put(bucket, key.clone(), value.clone())
            }
        }
    }

    /// Apply a committed transaction in order
    pub fn apply_all(&mut self, operations: &[Operation]) {
        for operation in operations {
            self.apply(operation);
        }
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Bucket names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.buckets.keys().cloned().collect()
    }

    /// Iterate buckets in sorted name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Bucket)> {
        self.buckets.iter()
    }

    fn create_or_get(&mut self, name: &str) -> &mut Bucket {
        self.buckets.entry(name.to_string()).or_default()
    }
}
