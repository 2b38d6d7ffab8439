//! Record codec
//!
//! Encoding and decoding of scalars to and from stored record bytes.

use bytes::{Buf, BufMut};

use crate::error::{MpdbError, Result};

use super::{RecordKind, Scalar};

/// Width of every numeric payload
const NUMERIC_SIZE: usize = 8;

/// Encode a scalar to record bytes
///
/// Format: kind (1) + payload
pub fn encode(value: &Scalar) -> Vec<u8> {
    let mut record = match value {
        Scalar::Str(s) => Vec::with_capacity(1 + 4 + s.len()),
        _ => Vec::with_capacity(1 + NUMERIC_SIZE),
    };
    record.put_u8(value.kind() as u8);

    match value {
        Scalar::U64(v) => record.put_u64_le(*v),
        Scalar::I64(v) => record.put_i64_le(*v),
        Scalar::Int(v) => record.put_i64_le(*v as i64),
        Scalar::Uint(v) => record.put_u64_le(*v as u64),
        Scalar::Str(s) => {
            record.put_u32_le(s.len() as u32);
            record.put_slice(s.as_bytes());
        }
    }

    record
}

/// Decode record bytes to a scalar
///
/// An empty record or an unrecognized kind selector yields
/// `MpdbError::NoValue`; anything that does not parse into the record shape
/// yields `MpdbError::CorruptRecord`.
pub fn decode(bytes: &[u8]) -> Result<Scalar> {
    let mut buf = bytes;
    if !buf.has_remaining() {
        return Err(MpdbError::NoValue);
    }

    let kind = match RecordKind::from_tag(buf.get_u8()) {
        Some(kind) => kind,
        None => return Err(MpdbError::NoValue),
    };

    let value = match kind {
        RecordKind::U64 => Scalar::U64(read_numeric(&mut buf)?),
        RecordKind::I64 => Scalar::I64(read_numeric(&mut buf)? as i64),
        RecordKind::Int => {
            let wide = read_numeric(&mut buf)? as i64;
            let v = isize::try_from(wide).map_err(|_| {
                MpdbError::CorruptRecord(format!("int {} does not fit this platform", wide))
            })?;
            Scalar::Int(v)
        }
        RecordKind::Uint => {
            let wide = read_numeric(&mut buf)?;
            let v = usize::try_from(wide).map_err(|_| {
                MpdbError::CorruptRecord(format!("uint {} does not fit this platform", wide))
            })?;
            Scalar::Uint(v)
        }
        RecordKind::Str => {
            if buf.remaining() < 4 {
                return Err(MpdbError::CorruptRecord(
                    "string record: missing length".to_string(),
                ));
            }
            let len = buf.get_u32_le() as usize;
            if buf.remaining() < len {
                return Err(MpdbError::CorruptRecord(format!(
                    "string record: incomplete payload (expected {}, got {})",
                    len,
                    buf.remaining()
                )));
            }
            let s = std::str::from_utf8(&buf[..len])
                .map_err(|e| MpdbError::CorruptRecord(format!("string record: {}", e)))?
                .to_string();
            buf.advance(len);
            Scalar::Str(s)
        }
    };

    if buf.has_remaining() {
        return Err(MpdbError::CorruptRecord(format!(
            "{} trailing bytes after {:?} record",
            buf.remaining(),
            kind
        )));
    }

    Ok(value)
}

/// Decode the result of a key lookup
///
/// Absent keys and records without a value are `Ok(None)`, never a zero
/// value.
pub fn decode_lookup(bytes: Option<&[u8]>) -> Result<Option<Scalar>> {
    match bytes {
        None => Ok(None),
        Some(bytes) => match decode(bytes) {
            Ok(value) => Ok(Some(value)),
            Err(MpdbError::NoValue) => Ok(None),
            Err(e) => Err(e),
        },
    }
}

fn read_numeric(buf: &mut &[u8]) -> Result<u64> {
    if buf.remaining() < NUMERIC_SIZE {
        return Err(MpdbError::CorruptRecord(format!(
            "numeric record: expected {} payload bytes, got {}",
            NUMERIC_SIZE,
            buf.remaining()
        )));
    }
    Ok(buf.get_u64_le())
}
