//! Record Module
//!
//! The only value representation mpdb stores: a discriminated scalar.
//!
//! Clients are scripting runtimes without floating point, so the set of
//! kinds is closed: two fixed-width integers, two machine-width integers
//! and strings. Composite data is flattened into several keys of a bucket.
//!
//! ## Record Format
//! ```text
//! ┌──────────┬─────────────────────────────────────────┐
//! │ Kind (1) │ Payload                                 │
//! └──────────┴─────────────────────────────────────────┘
//! ```
//!
//! ### Payload by Kind
//! - 0x00 U64:  u64 little-endian (8)
//! - 0x01 I64:  i64 little-endian (8)
//! - 0x02 INT:  isize widened to i64 little-endian (8)
//! - 0x03 UINT: usize widened to u64 little-endian (8)
//! - 0x04 STR:  len (4) + UTF-8 bytes

mod codec;
mod scalar;

pub use codec::{decode, decode_lookup, encode};
pub use scalar::Scalar;

/// Record kind selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    U64 = 0x00,
    I64 = 0x01,
    Int = 0x02,
    Uint = 0x03,
    Str = 0x04,
}

impl RecordKind {
    /// Map a selector byte back to a kind; unknown selectors have no value
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(RecordKind::U64),
            0x01 => Some(RecordKind::I64),
            0x02 => Some(RecordKind::Int),
            0x03 => Some(RecordKind::Uint),
            0x04 => Some(RecordKind::Str),
            _ => None,
        }
    }
}
