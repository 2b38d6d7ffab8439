//! Snapshot Reader
//!
//! Loads and validates a snapshot file into a bucket table.

use std::fs;
use std::path::Path;

use crate::bucket::BucketTable;
use crate::error::{MpdbError, Result};

use super::{
    Snapshot, EMPTY_BUCKET_MARKER, ENTRY_PREFIX_SIZE, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION,
};

/// Reader for snapshot files
pub struct SnapshotReader;

impl SnapshotReader {
    /// Load a snapshot, verifying magic, version and data checksum
    pub fn load(path: &Path) -> Result<Snapshot> {
        let bytes = fs::read(path)?;
        let min_size = (HEADER_SIZE + FOOTER_SIZE) as usize;
        if bytes.len() < min_size {
            return Err(MpdbError::Storage(format!(
                "Snapshot too small: {} bytes",
                bytes.len()
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(MpdbError::Storage(format!(
                "Invalid snapshot magic: expected MPDB, got {:?}",
                &bytes[0..4]
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(MpdbError::Storage(format!(
                "Unsupported snapshot version: {}",
                version
            )));
        }

        let entry_count = read_u64(&bytes[6..14]);

        let footer_start = bytes.len() - FOOTER_SIZE as usize;
        let last_lsn = read_u64(&bytes[footer_start..footer_start + 8]);
        let expected_crc = read_u32(&bytes[footer_start + 8..footer_start + 12]);

        let data = &bytes[HEADER_SIZE as usize..footer_start];
        let actual_crc = crc32fast::hash(data);
        if actual_crc != expected_crc {
            return Err(MpdbError::Storage(format!(
                "Snapshot CRC mismatch: expected {:08x}, got {:08x}",
                expected_crc, actual_crc
            )));
        }

        let table = parse_entries(data, entry_count)?;

        Ok(Snapshot {
            path: path.to_path_buf(),
            table,
            last_lsn,
            entry_count,
        })
    }
}

/// Parse the data block: [bucket_len(4)][key_len(4)][val_len(4)][bucket][key][value]
fn parse_entries(data: &[u8], expected: u64) -> Result<BucketTable> {
    let mut table = BucketTable::new();
    let mut pos = 0;
    let mut count = 0u64;

    while pos < data.len() {
        if pos + ENTRY_PREFIX_SIZE > data.len() {
            return Err(truncated(pos));
        }
        let bucket_len = read_u32(&data[pos..pos + 4]) as usize;
        let key_len = read_u32(&data[pos + 4..pos + 8]) as usize;
        let val_len = read_u32(&data[pos + 8..pos + 12]);
        pos += ENTRY_PREFIX_SIZE;

        let bucket = read_string(data, &mut pos, bucket_len)?;
        let key = read_string(data, &mut pos, key_len)?;

        if val_len == EMPTY_BUCKET_MARKER {
            table.create_bucket(&bucket);
        } else {
            let val_len = val_len as usize;
            if pos + val_len > data.len() {
                return Err(truncated(pos));
            }
            table.put(&bucket, key, data[pos..pos + val_len].to_vec());
            pos += val_len;
        }
        count += 1;
    }

    if count != expected {
        return Err(MpdbError::Storage(format!(
            "Snapshot entry count mismatch: header says {}, found {}",
            expected, count
        )));
    }

    Ok(table)
}

fn read_string(data: &[u8], pos: &mut usize, len: usize) -> Result<String> {
    if *pos + len > data.len() {
        return Err(truncated(*pos));
    }
    let s = std::str::from_utf8(&data[*pos..*pos + len])
        .map_err(|e| MpdbError::Storage(format!("Snapshot name at offset {}: {}", *pos, e)))?
        .to_string();
    *pos += len;
    Ok(s)
}

fn truncated(pos: usize) -> MpdbError {
    MpdbError::Storage(format!("Snapshot entry truncated at data offset {}", pos))
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}
