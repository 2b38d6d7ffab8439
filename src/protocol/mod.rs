//! Protocol Module
//!
//! Defines the wire protocol between embedded clients and the server.
//!
//! ## Protocol Format
//!
//! One MessagePack map per UDP datagram.
//!
//! ### Request Fields
//! - `oper`:   operation name (see below)
//! - `nodeid`: u64, the node the client claims to be
//! - `echo`:   u64, client-chosen sequence number, increasing per session
//! - `data`:   map of key → integer/string (PERSIST, INSERT)
//! - `keys`:   list of keys (GETPERSIST, GET)
//! - `bucket`: collection name (GETBUCKET)
//!
//! ### Operations
//! - PERSIST, GETPERSIST: node-private bucket
//! - INSERT, GET, GETBUCKET: shared collections
//! - DELETE, SUBSCRIBE: accepted, not acted upon
//!
//! ### Response Fields
//! - `oper`:   always "RESPONSE"
//! - `nodeid`, `echo`: copied from the request
//! - `result`: map of key → value (nil for keys without a value), or nil
//! - `error`:  error text, or nil on success
//!
//! Datagrams are parsed once, here, into typed envelopes; nothing past this
//! module looks at raw map fields.

mod codec;
mod envelope;
mod response;

pub use codec::{decode_envelope, decode_response, encode_envelope, encode_response};
pub use envelope::{Envelope, OperationType, Request};
pub use response::{Response, RESPONSE_OPER};
