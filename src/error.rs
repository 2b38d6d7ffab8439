//! Error types for mpdb
//!
//! Provides a unified error type for all operations. The `Display` text of
//! an error is what a client sees in the `error` field of a response.

use thiserror::Error;

/// Result type alias using MpdbError
pub type Result<T> = std::result::Result<T, MpdbError>;

/// Unified error type for mpdb operations
#[derive(Debug, Error)]
pub enum MpdbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Bucket error: {0}")]
    Bucket(String),

    #[error("Could not encode value: {0}")]
    Encode(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("No valid value")]
    NoValue,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Malformed envelope: {0}")]
    Decode(String),

    #[error("Envelope is missing field '{0}'")]
    MissingField(&'static str),

    #[error("Node {session} cannot access data with nodeid {requested}")]
    Authorization { session: u64, requested: u64 },

    #[error("Unsupported operation {0}")]
    UnsupportedOperation(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Transport error: {0}")]
    Transport(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
