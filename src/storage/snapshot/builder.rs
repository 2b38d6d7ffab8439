//! Snapshot Builder
//!
//! Streams bucket entries into a new snapshot file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::bucket::BucketTable;
use crate::error::{MpdbError, Result};

use super::{EMPTY_BUCKET_MARKER, HEADER_SIZE, MAGIC, VERSION};

/// Builder for creating a snapshot file
pub struct SnapshotBuilder {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Number of entries written
    entry_count: u64,
    /// Running CRC hasher for data section
    data_hasher: crc32fast::Hasher,
}

impl SnapshotBuilder {
    /// Create a new snapshot builder
    ///
    /// Writes header immediately; call `add()`/`add_empty_bucket()`, then
    /// `finish()` to write the footer.
    pub fn new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);

        // Entry count placeholder, rewritten in finish
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            entry_count: 0,
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Write every bucket of a table
    pub fn add_table(&mut self, table: &BucketTable) -> Result<()> {
        for (name, bucket) in table.iter() {
            if bucket.is_empty() {
                self.add_empty_bucket(name)?;
                continue;
            }
            for (key, value) in bucket {
                self.add(name, key, value)?;
            }
        }
        Ok(())
    }

    /// Add one key of a bucket
    pub fn add(&mut self, bucket: &str, key: &str, value: &[u8]) -> Result<()> {
        self.write_entry(bucket, key.as_bytes(), Some(value))
    }

    /// Record a bucket that exists but holds no keys
    pub fn add_empty_bucket(&mut self, bucket: &str) -> Result<()> {
        self.write_entry(bucket, &[], None)
    }

    /// Internal: write an entry (value=None means empty-bucket marker)
    fn write_entry(&mut self, bucket: &str, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        let val_len = match value {
            Some(v) => v.len() as u32,
            None => EMPTY_BUCKET_MARKER,
        };

        let mut prefix = Vec::with_capacity(12);
        prefix.extend_from_slice(&(bucket.len() as u32).to_le_bytes());
        prefix.extend_from_slice(&(key.len() as u32).to_le_bytes());
        prefix.extend_from_slice(&val_len.to_le_bytes());

        for part in [prefix.as_slice(), bucket.as_bytes(), key, value.unwrap_or(&[])] {
            self.writer.write_all(part)?;
            self.data_hasher.update(part);
        }

        self.entry_count += 1;
        Ok(())
    }

    /// Finish building: write footer and return the entry count
    pub fn finish(mut self, last_lsn: u64) -> Result<u64> {
        let data_crc = self.data_hasher.finalize();

        self.writer.write_all(&last_lsn.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?; // Padding for alignment
        self.writer.flush()?;

        let mut file = self.writer.into_inner().map_err(|e| {
            MpdbError::Storage(format!(
                "Failed to flush snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;
        file.seek(SeekFrom::Start(HEADER_SIZE - 8))?; // After magic + version
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;

        Ok(self.entry_count)
    }
}
