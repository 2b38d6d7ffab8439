//! Protocol codec
//!
//! MessagePack encoding and decoding of envelopes and responses.
//!
//! Decoding is two-staged: the datagram is first read into a loose
//! `RawEnvelope` that tolerates any field types the embedded clients send,
//! then validated into a typed `Envelope`.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::engine::DataMap;
use crate::error::{MpdbError, Result};
use crate::record::Scalar;

use super::{Envelope, OperationType, Request, Response};

// =============================================================================
// Raw wire shapes
// =============================================================================

/// Envelope as it arrives, before validation
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    oper: Option<String>,
    #[serde(default)]
    nodeid: Option<WireTag>,
    #[serde(default)]
    echo: Option<WireTag>,
    #[serde(default)]
    data: Option<BTreeMap<String, WireValue>>,
    #[serde(default)]
    keys: Option<Vec<String>>,
    #[serde(default)]
    bucket: Option<String>,
}

/// Integer tag; clients may encode it signed or unsigned
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum WireTag {
    Unsigned(u64),
    Signed(i64),
}

impl WireTag {
    fn value(self) -> u64 {
        match self {
            WireTag::Unsigned(v) => v,
            WireTag::Signed(v) => v as u64,
        }
    }
}

/// A `data` value: a storable scalar, or the name of a kind we refuse
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireValue {
    Scalar(Scalar),
    Other(UnsupportedKind),
}

/// Any MessagePack value that is not an integer or string
#[derive(Debug)]
struct UnsupportedKind(&'static str);

struct UnsupportedKindVisitor;

impl<'de> Visitor<'de> for UnsupportedKindVisitor {
    type Value = UnsupportedKind;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any MessagePack value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<UnsupportedKind, E> {
        Ok(UnsupportedKind("boolean"))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<UnsupportedKind, E> {
        Ok(UnsupportedKind("float"))
    }

    fn visit_bytes<E: de::Error>(self, _: &[u8]) -> std::result::Result<UnsupportedKind, E> {
        Ok(UnsupportedKind("binary"))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<UnsupportedKind, E> {
        Ok(UnsupportedKind("nil"))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<UnsupportedKind, E> {
        Ok(UnsupportedKind("nil"))
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<UnsupportedKind, D::Error> {
        deserializer.deserialize_any(UnsupportedKindVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<UnsupportedKind, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(UnsupportedKind("array"))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<UnsupportedKind, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(UnsupportedKind("map"))
    }
}

impl<'de> Deserialize<'de> for UnsupportedKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(UnsupportedKindVisitor)
    }
}

/// Envelope as the client library sends it
#[derive(Serialize)]
struct OutgoingEnvelope<'a> {
    oper: &'a str,
    nodeid: u64,
    echo: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a DataMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keys: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket: Option<&'a str>,
}

// =============================================================================
// Envelope Encoding/Decoding
// =============================================================================

/// Decode and validate one datagram
///
/// Fails with `MpdbError::Decode` when the bytes are not a MessagePack map
/// of the expected shape, and with `MpdbError::MissingField` when `oper`,
/// `nodeid` or `echo` is absent.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope> {
    let raw: RawEnvelope =
        rmp_serde::from_slice(bytes).map_err(|e| MpdbError::Decode(e.to_string()))?;

    let echo = raw.echo.ok_or(MpdbError::MissingField("echo"))?.value();
    let nodeid = raw.nodeid.ok_or(MpdbError::MissingField("nodeid"))?.value();
    let oper = raw.oper.ok_or(MpdbError::MissingField("oper"))?;

    let request = match OperationType::parse(&oper) {
        Some(OperationType::Persist) => match scalar_data(raw.data) {
            Ok(data) => Request::Persist { data },
            Err(reason) => rejected(OperationType::Persist, reason),
        },
        Some(OperationType::GetPersist) => Request::GetPersist {
            keys: raw.keys.unwrap_or_default(),
        },
        Some(OperationType::Insert) => match scalar_data(raw.data) {
            Ok(data) => Request::Insert { data },
            Err(reason) => rejected(OperationType::Insert, reason),
        },
        Some(OperationType::Get) => Request::Get {
            keys: raw.keys.unwrap_or_default(),
        },
        Some(OperationType::GetBucket) => Request::GetBucket {
            bucket: raw.bucket.unwrap_or_default(),
        },
        Some(OperationType::Delete) => Request::Delete,
        Some(OperationType::Subscribe) => Request::Subscribe,
        None => Request::Unsupported { oper },
    };

    Ok(Envelope::new(nodeid, echo, request))
}

/// Encode an envelope the way a client sends it
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>> {
    let mut out = OutgoingEnvelope {
        oper: envelope.request.oper(),
        nodeid: envelope.nodeid,
        echo: envelope.echo,
        data: None,
        keys: None,
        bucket: None,
    };

    match &envelope.request {
        Request::Persist { data } | Request::Insert { data } => out.data = Some(data),
        Request::GetPersist { keys } | Request::Get { keys } => out.keys = Some(keys.as_slice()),
        Request::GetBucket { bucket } => out.bucket = Some(bucket.as_str()),
        _ => {}
    }

    rmp_serde::to_vec_named(&out).map_err(|e| MpdbError::Serialization(e.to_string()))
}

/// Keep only storable values; the first unsupported one rejects the request
fn scalar_data(raw: Option<BTreeMap<String, WireValue>>) -> std::result::Result<DataMap, String> {
    let mut data = DataMap::new();
    for (key, value) in raw.unwrap_or_default() {
        match value {
            WireValue::Scalar(scalar) => {
                data.insert(key, scalar);
            }
            WireValue::Other(UnsupportedKind(kind)) => {
                return Err(format!("key {} holds an unsupported {} value", key, kind));
            }
        }
    }
    Ok(data)
}

fn rejected(oper: OperationType, reason: String) -> Request {
    Request::Rejected { oper, reason }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response as a named MessagePack map
pub fn encode_response(response: &Response) -> Result<Bytes> {
    rmp_serde::to_vec_named(response)
        .map(Bytes::from)
        .map_err(|e| MpdbError::Serialization(e.to_string()))
}

/// Decode a response (client side)
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    rmp_serde::from_slice(bytes).map_err(|e| MpdbError::Decode(e.to_string()))
}
