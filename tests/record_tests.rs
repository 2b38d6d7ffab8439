//! Tests for the scalar record format
//!
//! These tests verify:
//! - Every kind encodes with its selector byte and fixed layout
//! - Empty records and unknown selectors have no value
//! - Truncated or padded records are corrupt
//! - Lookups map absent keys to "no value"

use mpdb::record::{decode, decode_lookup, encode, RecordKind, Scalar};
use mpdb::MpdbError;

// =============================================================================
// Encoding Layout Tests
// =============================================================================

#[test]
fn test_encode_u64_layout() {
    let bytes = encode(&Scalar::U64(1));
    assert_eq!(bytes, vec![0x00, 1, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_encode_i64_layout() {
    let bytes = encode(&Scalar::I64(-1));
    assert_eq!(bytes[0], RecordKind::I64 as u8);
    assert_eq!(&bytes[1..], &[0xff; 8]);
}

#[test]
fn test_encode_string_layout() {
    let bytes = encode(&Scalar::from("hi"));
    assert_eq!(bytes, vec![0x04, 2, 0, 0, 0, b'h', b'i']);
}

#[test]
fn test_machine_width_kinds_are_distinct() {
    let int = encode(&Scalar::Int(7));
    let uint = encode(&Scalar::Uint(7));
    assert_eq!(int[0], RecordKind::Int as u8);
    assert_eq!(uint[0], RecordKind::Uint as u8);
    assert_eq!(&int[1..], &uint[1..]);
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_each_kind() {
    let values = vec![
        Scalar::U64(u64::MAX),
        Scalar::I64(i64::MIN),
        Scalar::Int(-42),
        Scalar::Uint(42),
        Scalar::from(""),
        Scalar::from("héllo wörld"),
    ];

    for value in values {
        assert_eq!(decode(&encode(&value)).unwrap(), value);
    }
}

#[test]
fn test_decode_empty_is_no_value() {
    assert!(matches!(decode(&[]), Err(MpdbError::NoValue)));
}

#[test]
fn test_decode_unknown_selector_is_no_value() {
    assert!(matches!(decode(&[0x09, 1, 2, 3]), Err(MpdbError::NoValue)));
}

#[test]
fn test_decode_truncated_numeric() {
    let result = decode(&[0x00, 1, 2, 3]);
    assert!(matches!(result, Err(MpdbError::CorruptRecord(_))));
}

#[test]
fn test_decode_truncated_string() {
    let mut bytes = encode(&Scalar::from("hello"));
    bytes.truncate(bytes.len() - 2);
    assert!(matches!(decode(&bytes), Err(MpdbError::CorruptRecord(_))));
}

#[test]
fn test_decode_missing_string_length() {
    assert!(matches!(decode(&[0x04, 1]), Err(MpdbError::CorruptRecord(_))));
}

#[test]
fn test_decode_trailing_bytes() {
    let mut bytes = encode(&Scalar::U64(5));
    bytes.push(0);
    assert!(matches!(decode(&bytes), Err(MpdbError::CorruptRecord(_))));
}

#[test]
fn test_decode_invalid_utf8() {
    let bytes = vec![0x04, 2, 0, 0, 0, 0xff, 0xfe];
    assert!(matches!(decode(&bytes), Err(MpdbError::CorruptRecord(_))));
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_lookup_absent_key() {
    assert_eq!(decode_lookup(None).unwrap(), None);
}

#[test]
fn test_lookup_no_value_is_none_not_zero() {
    assert_eq!(decode_lookup(Some(&[])).unwrap(), None);
    assert_eq!(decode_lookup(Some(&[0x7f])).unwrap(), None);
}

#[test]
fn test_lookup_corrupt_propagates() {
    assert!(decode_lookup(Some(&[0x01, 0])).is_err());
}

#[test]
fn test_lookup_value() {
    let bytes = encode(&Scalar::I64(-3));
    assert_eq!(decode_lookup(Some(&bytes)).unwrap(), Some(Scalar::I64(-3)));
}

// =============================================================================
// Scalar Helper Tests
// =============================================================================

#[test]
fn test_parse_lossy() {
    assert_eq!(Scalar::parse_lossy("12"), Scalar::U64(12));
    assert_eq!(Scalar::parse_lossy("-12"), Scalar::I64(-12));
    assert_eq!(Scalar::parse_lossy("1.5"), Scalar::from("1.5"));
    assert_eq!(Scalar::parse_lossy("abc"), Scalar::from("abc"));
}

#[test]
fn test_kind_from_tag() {
    for kind in [
        RecordKind::U64,
        RecordKind::I64,
        RecordKind::Int,
        RecordKind::Uint,
        RecordKind::Str,
    ] {
        assert_eq!(RecordKind::from_tag(kind as u8), Some(kind));
    }
    assert_eq!(RecordKind::from_tag(0x05), None);
}
