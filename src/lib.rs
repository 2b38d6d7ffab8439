//! # mpdb
//!
//! A collection-oriented key/value store for small embedded clients:
//! - MessagePack envelopes over UDP
//! - Per-client sliding echo window for in-order, exactly-once commits
//! - Write-Ahead Logging (WAL) with snapshot checkpoints for durability
//! - Private per-node buckets and shared, key-prefixed collections
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      UDP Server                              │
//! │              (single dispatch thread)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ decode + route by peer address
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Sessions                                  │
//! │       (echo window, worker thread, resend timer)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ PERSIST / GET / INSERT / ...
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Engine                                   │
//! │         (Single Writer / Multi Reader transactions)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │   Buckets   │
//!   │  (Append)   │          │  (RwLock)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ checkpoint
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Snapshot   │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod wal;
pub mod bucket;
pub mod storage;
pub mod engine;
pub mod protocol;
pub mod session;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MpdbError, Result};
pub use config::Config;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of mpdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
