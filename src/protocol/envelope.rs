//! Envelope definitions
//!
//! Represents validated requests from clients.

use crate::engine::DataMap;

/// Operation names understood on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Persist,
    GetPersist,
    Insert,
    Get,
    GetBucket,
    Delete,
    Subscribe,
}

impl OperationType {
    /// Wire name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Persist => "PERSIST",
            OperationType::GetPersist => "GETPERSIST",
            OperationType::Insert => "INSERT",
            OperationType::Get => "GET",
            OperationType::GetBucket => "GETBUCKET",
            OperationType::Delete => "DELETE",
            OperationType::Subscribe => "SUBSCRIBE",
        }
    }

    /// Parse a wire name; names are case-sensitive
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "PERSIST" => Some(OperationType::Persist),
            "GETPERSIST" => Some(OperationType::GetPersist),
            "INSERT" => Some(OperationType::Insert),
            "GET" => Some(OperationType::Get),
            "GETBUCKET" => Some(OperationType::GetBucket),
            "DELETE" => Some(OperationType::Delete),
            "SUBSCRIBE" => Some(OperationType::Subscribe),
            _ => None,
        }
    }
}

/// A parsed request
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Write to the sender's private bucket
    Persist { data: DataMap },

    /// Read from the sender's private bucket (all keys when empty)
    GetPersist { keys: Vec<String> },

    /// Write to shared collections
    Insert { data: DataMap },

    /// Read from shared collections
    Get { keys: Vec<String> },

    /// Read a whole shared collection
    GetBucket { bucket: String },

    /// Placeholder, not acted upon
    Delete,

    /// Placeholder, not acted upon
    Subscribe,

    /// An operation name the server does not know
    Unsupported { oper: String },

    /// A known operation whose payload cannot be stored
    Rejected { oper: OperationType, reason: String },
}

impl Request {
    /// Wire name of the operation this request carries
    pub fn oper(&self) -> &str {
        match self {
            Request::Persist { .. } => OperationType::Persist.as_str(),
            Request::GetPersist { .. } => OperationType::GetPersist.as_str(),
            Request::Insert { .. } => OperationType::Insert.as_str(),
            Request::Get { .. } => OperationType::Get.as_str(),
            Request::GetBucket { .. } => OperationType::GetBucket.as_str(),
            Request::Delete => OperationType::Delete.as_str(),
            Request::Subscribe => OperationType::Subscribe.as_str(),
            Request::Unsupported { oper } => oper,
            Request::Rejected { oper, .. } => oper.as_str(),
        }
    }
}

/// A request tagged with its session sequence number
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Node id claimed by the client
    pub nodeid: u64,

    /// Echo tag
    pub echo: u64,

    pub request: Request,
}

impl Envelope {
    pub fn new(nodeid: u64, echo: u64, request: Request) -> Self {
        Self {
            nodeid,
            echo,
            request,
        }
    }
}
