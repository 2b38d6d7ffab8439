//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{MpdbError, Result};

/// Header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound on a single entry payload (64 MB)
pub(crate) const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// A single entry in the WAL: one committed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// Every mutation of the transaction, in order
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Mutations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a bucket if it does not exist
    CreateBucket { bucket: String },

    /// Overwrite a key inside a bucket with an encoded record
    Put {
        bucket: String,
        key: String,
        value: Vec<u8>,
    },
}

/// Serialized body of an entry (everything after the header)
#[derive(Serialize, Deserialize)]
struct Body {
    operations: Vec<Operation>,
    timestamp: u64,
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operations,
            timestamp,
        }
    }

    /// Serialize to the on-disk frame: header + data
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let body = Body {
            operations: self.operations.clone(),
            timestamp: self.timestamp,
        };
        let data = bincode::serialize(&body)
            .map_err(|e| MpdbError::Serialization(format!("WAL entry {}: {}", self.lsn, e)))?;

        if data.len() > MAX_PAYLOAD_SIZE {
            return Err(MpdbError::WalWrite(format!(
                "Entry too large: {} bytes (max {})",
                data.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let crc = compute_crc(self.lsn, &data);

        let mut frame = Vec::with_capacity(HEADER_SIZE + data.len());
        frame.extend_from_slice(&self.lsn.to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&(data.len() as u32).to_le_bytes());
        frame.extend_from_slice(&data);
        Ok(frame)
    }

    /// Deserialize a complete frame, verifying its checksum
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(MpdbError::WalCorruption(format!(
                "Incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let (lsn, crc, len) = parse_header(&bytes[..HEADER_SIZE]);
        let data = &bytes[HEADER_SIZE..];
        if data.len() != len {
            return Err(MpdbError::WalCorruption(format!(
                "Payload length mismatch for LSN {}: header says {}, got {}",
                lsn,
                len,
                data.len()
            )));
        }

        Self::from_parts(lsn, crc, data)
    }

    /// Build an entry from an already split header and payload
    pub(crate) fn from_parts(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let actual = compute_crc(lsn, data);
        if actual != crc {
            return Err(MpdbError::WalCorruption(format!(
                "CRC mismatch for LSN {}: expected {:08x}, got {:08x}",
                lsn, crc, actual
            )));
        }

        let body: Body = bincode::deserialize(data)
            .map_err(|e| MpdbError::WalCorruption(format!("LSN {}: {}", lsn, e)))?;

        Ok(Self {
            lsn,
            operations: body.operations,
            timestamp: body.timestamp,
        })
    }
}

/// Split a header into (lsn, crc, payload_len)
pub(crate) fn parse_header(header: &[u8]) -> (u64, u32, usize) {
    let mut lsn = [0u8; 8];
    lsn.copy_from_slice(&header[0..8]);
    let mut crc = [0u8; 4];
    crc.copy_from_slice(&header[8..12]);
    let mut len = [0u8; 4];
    len.copy_from_slice(&header[12..16]);

    (
        u64::from_le_bytes(lsn),
        u32::from_le_bytes(crc),
        u32::from_le_bytes(len) as usize,
    )
}

/// CRC covers the LSN and the payload so a relabelled entry is detected
fn compute_crc(lsn: u64, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&lsn.to_le_bytes());
    hasher.update(data);
    hasher.finalize()
}
