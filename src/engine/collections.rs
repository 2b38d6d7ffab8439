//! Collection operations
//!
//! The five operations clients reach through the protocol. Each runs in its
//! own transaction.
//!
//! ## Key Routing
//! - `"col.x"` → bucket `col`, key `x` (split at the first dot only)
//! - `"x"`     → bucket `global`, key `x`

use std::collections::BTreeMap;

use crate::error::Result;
use crate::record::Scalar;

use super::Engine;

/// Bucket that holds keys without a collection prefix
pub const GLOBAL_BUCKET: &str = "global";

/// Key → value input of a write operation
pub type DataMap = BTreeMap<String, Scalar>;

/// Key → value output of a read operation; `None` marks a key with no value
pub type ResultMap = BTreeMap<String, Option<Scalar>>;

/// Name of the private bucket owned by a node
pub fn node_bucket(node_id: u64) -> String {
    node_id.to_string()
}

/// Split a client key into (bucket, key)
pub fn route_key(key: &str) -> (&str, &str) {
    match key.split_once('.') {
        Some((bucket, rest)) => (bucket, rest),
        None => (GLOBAL_BUCKET, key),
    }
}

/// Client-facing name of a routed key
fn qualified_key(bucket: &str, key: &str) -> String {
    if bucket == GLOBAL_BUCKET {
        key.to_string()
    } else {
        format!("{}.{}", bucket, key)
    }
}

impl Engine {
    /// Store key/value pairs in a node's private bucket
    ///
    /// Existing keys are overwritten.
    pub fn persist(&self, node: &str, data: &DataMap) -> Result<()> {
        self.update(|tx| {
            let mut bucket = tx.bucket(node)?;
            for (key, value) in data {
                bucket.put(key, value)?;
            }
            Ok(())
        })
    }

    /// Read keys from a node's private bucket
    ///
    /// With an empty `keys` list every pair in the bucket is returned. Fails
    /// when the node has never persisted anything.
    pub fn get_persist(&self, node: &str, keys: &[String]) -> Result<ResultMap> {
        self.view(|tx| {
            let bucket = tx.bucket(node)?;
            if keys.is_empty() {
                return Ok(bucket.scan()?.into_iter().collect());
            }

            let mut result = ResultMap::new();
            for key in keys {
                result.insert(key.clone(), bucket.get(key)?);
            }
            Ok(result)
        })
    }

    /// Store key/value pairs in shared collections routed by key prefix
    pub fn insert(&self, data: &DataMap) -> Result<()> {
        self.update(|tx| {
            for (key, value) in data {
                let (bucket, key) = route_key(key);
                tx.bucket(bucket)?.put(key, value)?;
            }
            Ok(())
        })
    }

    /// Read keys from shared collections
    ///
    /// Prefixed keys come back prefixed with their collection; keys of the
    /// global collection come back bare.
    pub fn get(&self, keys: &[String]) -> Result<ResultMap> {
        self.view(|tx| {
            let mut result = ResultMap::new();
            for key in keys {
                let (bucket_name, key) = route_key(key);
                let bucket = tx.bucket(bucket_name)?;
                result.insert(qualified_key(bucket_name, key), bucket.get(key)?);
            }
            Ok(result)
        })
    }

    /// Read a whole collection, every key prefixed with `name.`
    pub fn get_bucket(&self, name: &str) -> Result<ResultMap> {
        self.view(|tx| {
            let bucket = tx.bucket(name)?;
            Ok(bucket
                .scan()?
                .into_iter()
                .map(|(key, value)| (format!("{}.{}", name, key), value))
                .collect())
        })
    }
}
