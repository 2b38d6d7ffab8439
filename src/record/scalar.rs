//! Scalar values
//!
//! On the wire a scalar is a plain MessagePack integer or string; the kind
//! distinction only survives inside the record store.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::RecordKind;

/// A single typed value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// Unsigned 64-bit integer
    U64(u64),

    /// Signed 64-bit integer
    I64(i64),

    /// Machine-width signed integer
    Int(isize),

    /// Machine-width unsigned integer
    Uint(usize),

    /// UTF-8 string
    Str(String),
}

impl Scalar {
    /// Get the record kind
    pub fn kind(&self) -> RecordKind {
        match self {
            Scalar::U64(_) => RecordKind::U64,
            Scalar::I64(_) => RecordKind::I64,
            Scalar::Int(_) => RecordKind::Int,
            Scalar::Uint(_) => RecordKind::Uint,
            Scalar::Str(_) => RecordKind::Str,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a command-line token: integers first, anything else is a string
    pub fn parse_lossy(token: &str) -> Self {
        if let Ok(v) = token.parse::<u64>() {
            Scalar::U64(v)
        } else if let Ok(v) = token.parse::<i64>() {
            Scalar::I64(v)
        } else {
            Scalar::Str(token.to_string())
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::U64(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Uint(v) => write!(f, "{}", v),
            Scalar::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::U64(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<usize> for Scalar {
    fn from(v: usize) -> Self {
        Scalar::Uint(v)
    }
}

impl From<isize> for Scalar {
    fn from(v: isize) -> Self {
        Scalar::Int(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

// =============================================================================
// Wire representation
// =============================================================================

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::U64(v) => serializer.serialize_u64(*v),
            Scalar::I64(v) => serializer.serialize_i64(*v),
            Scalar::Int(v) => serializer.serialize_i64(*v as i64),
            Scalar::Uint(v) => serializer.serialize_u64(*v as u64),
            Scalar::Str(s) => serializer.serialize_str(s),
        }
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer or a string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
        Ok(Scalar::U64(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
        if v >= 0 {
            Ok(Scalar::U64(v as u64))
        } else {
            Ok(Scalar::I64(v))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
        Ok(Scalar::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
        Ok(Scalar::Str(v))
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}
