//! Tests for the envelope codec
//!
//! These tests verify:
//! - Envelopes as embedded clients encode them are parsed into requests
//! - Missing fields and malformed datagrams are reported
//! - Unstorable data values reject the request instead of the datagram
//! - Responses always carry an `error` field

use std::collections::BTreeMap;

use mpdb::engine::{DataMap, ResultMap};
use mpdb::protocol::{
    decode_envelope, decode_response, encode_envelope, encode_response, Envelope,
    OperationType, Request, Response, RESPONSE_OPER,
};
use mpdb::record::Scalar;
use mpdb::MpdbError;
use serde::de::IgnoredAny;
use serde::Serialize;

// =============================================================================
// Helper Functions
// =============================================================================

/// Encode any serializable value the way a MessagePack client would
fn msgpack<T: Serialize>(value: &T) -> Vec<u8> {
    rmp_serde::to_vec_named(value).unwrap()
}

#[derive(Serialize)]
struct ClientEnvelope<'a, D: Serialize> {
    oper: &'a str,
    nodeid: u64,
    echo: u64,
    data: D,
}

#[derive(Serialize)]
struct HeaderOnly<'a> {
    oper: &'a str,
    nodeid: i64,
    echo: i64,
}

// =============================================================================
// Envelope Decoding Tests
// =============================================================================

#[test]
fn test_decode_persist() {
    let mut data = BTreeMap::new();
    data.insert("a", 3u64);
    let bytes = msgpack(&ClientEnvelope {
        oper: "PERSIST",
        nodeid: 4660,
        echo: 1,
        data,
    });

    let envelope = decode_envelope(&bytes).unwrap();
    assert_eq!(envelope.nodeid, 4660);
    assert_eq!(envelope.echo, 1);

    let mut expected = DataMap::new();
    expected.insert("a".to_string(), Scalar::U64(3));
    assert_eq!(envelope.request, Request::Persist { data: expected });
}

#[test]
fn test_decode_signed_header_fields() {
    let bytes = msgpack(&HeaderOnly {
        oper: "GET",
        nodeid: 7,
        echo: 2,
    });

    let envelope = decode_envelope(&bytes).unwrap();
    assert_eq!(envelope.nodeid, 7);
    assert_eq!(envelope.echo, 2);
    assert_eq!(envelope.request, Request::Get { keys: Vec::new() });
}

#[test]
fn test_decode_mixed_scalars() {
    #[derive(Serialize)]
    #[serde(untagged)]
    enum V {
        N(i64),
        S(&'static str),
    }

    let mut data = BTreeMap::new();
    data.insert("neg", V::N(-5));
    data.insert("pos", V::N(5));
    data.insert("col.s", V::S("hello"));
    let bytes = msgpack(&ClientEnvelope {
        oper: "INSERT",
        nodeid: 1,
        echo: 1,
        data,
    });

    match decode_envelope(&bytes).unwrap().request {
        Request::Insert { data } => {
            assert_eq!(data["neg"], Scalar::I64(-5));
            assert_eq!(data["pos"], Scalar::U64(5));
            assert_eq!(data["col.s"], Scalar::from("hello"));
        }
        other => panic!("unexpected request {:?}", other),
    }
}

#[test]
fn test_decode_float_value_is_rejected() {
    let mut data = BTreeMap::new();
    data.insert("f", 1.5f64);
    let bytes = msgpack(&ClientEnvelope {
        oper: "PERSIST",
        nodeid: 1,
        echo: 3,
        data,
    });

    let envelope = decode_envelope(&bytes).unwrap();
    assert_eq!(envelope.echo, 3);
    match envelope.request {
        Request::Rejected { oper, reason } => {
            assert_eq!(oper, OperationType::Persist);
            assert!(reason.contains("float"));
        }
        other => panic!("unexpected request {:?}", other),
    }
}

#[test]
fn test_decode_nested_value_is_rejected() {
    let mut inner = BTreeMap::new();
    inner.insert("x", 1u64);
    let mut data = BTreeMap::new();
    data.insert("nested", inner);
    let bytes = msgpack(&ClientEnvelope {
        oper: "INSERT",
        nodeid: 1,
        echo: 1,
        data,
    });

    assert!(matches!(
        decode_envelope(&bytes).unwrap().request,
        Request::Rejected { .. }
    ));
}

#[test]
fn test_decode_placeholder_and_unknown_opers() {
    for (oper, expected) in [
        ("DELETE", Request::Delete),
        ("SUBSCRIBE", Request::Subscribe),
        (
            "FROB",
            Request::Unsupported {
                oper: "FROB".to_string(),
            },
        ),
        (
            "get",
            Request::Unsupported {
                oper: "get".to_string(),
            },
        ),
    ] {
        let bytes = msgpack(&HeaderOnly {
            oper,
            nodeid: 1,
            echo: 1,
        });
        assert_eq!(decode_envelope(&bytes).unwrap().request, expected);
    }
}

#[test]
fn test_decode_missing_echo() {
    #[derive(Serialize)]
    struct NoEcho {
        oper: &'static str,
        nodeid: u64,
    }
    let bytes = msgpack(&NoEcho {
        oper: "GET",
        nodeid: 1,
    });

    assert!(matches!(
        decode_envelope(&bytes),
        Err(MpdbError::MissingField("echo"))
    ));
}

#[test]
fn test_decode_missing_oper() {
    #[derive(Serialize)]
    struct NoOper {
        nodeid: u64,
        echo: u64,
    }
    let bytes = msgpack(&NoOper { nodeid: 1, echo: 1 });

    assert!(matches!(
        decode_envelope(&bytes),
        Err(MpdbError::MissingField("oper"))
    ));
}

#[test]
fn test_decode_garbage() {
    assert!(matches!(
        decode_envelope(b"\xc1not msgpack"),
        Err(MpdbError::Decode(_))
    ));
    assert!(matches!(decode_envelope(&[]), Err(MpdbError::Decode(_))));
}

#[test]
fn test_decode_non_map() {
    let bytes = msgpack(&vec![1u64, 2, 3]);
    assert!(decode_envelope(&bytes).is_err());
}

// =============================================================================
// Envelope Encoding Tests
// =============================================================================

#[test]
fn test_encode_envelope_is_readable() {
    let envelope = Envelope::new(
        12,
        4,
        Request::GetBucket {
            bucket: "col".to_string(),
        },
    );

    let decoded = decode_envelope(&encode_envelope(&envelope).unwrap()).unwrap();
    assert_eq!(decoded, envelope);
}

#[test]
fn test_encode_envelope_keys() {
    let envelope = Envelope::new(
        1,
        9,
        Request::GetPersist {
            keys: vec!["a".to_string(), "b".to_string()],
        },
    );

    let decoded = decode_envelope(&encode_envelope(&envelope).unwrap()).unwrap();
    assert_eq!(decoded.request, envelope.request);
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_success_response_carries_nil_error() {
    let response = Response::ok(3, 8, None);
    let bytes = encode_response(&response).unwrap();

    let fields: BTreeMap<String, IgnoredAny> = rmp_serde::from_slice(&bytes).unwrap();
    for field in ["oper", "nodeid", "echo", "result", "error"] {
        assert!(fields.contains_key(field), "missing {}", field);
    }

    let decoded = decode_response(&bytes).unwrap();
    assert_eq!(decoded, response);
    assert_eq!(decoded.oper, RESPONSE_OPER);
    assert!(decoded.is_ok());
}

#[test]
fn test_error_response_text() {
    let error = MpdbError::Authorization {
        session: 1,
        requested: 2,
    };
    let response = Response::error(2, 5, &error);

    let decoded = decode_response(&encode_response(&response).unwrap()).unwrap();
    assert!(!decoded.is_ok());
    assert_eq!(
        decoded.error.as_deref(),
        Some("Node 1 cannot access data with nodeid 2")
    );
    assert_eq!(decoded.result, None);
}

#[test]
fn test_response_result_with_missing_value() {
    let mut result = ResultMap::new();
    result.insert("a".to_string(), Some(Scalar::I64(-1)));
    result.insert("b".to_string(), None);
    let response = Response::ok(1, 1, Some(result));

    let decoded = decode_response(&encode_response(&response).unwrap()).unwrap();
    assert_eq!(decoded, response);
}
