//! Response definitions
//!
//! Represents responses to clients.

use serde::{Deserialize, Serialize};

use crate::engine::ResultMap;
use crate::error::MpdbError;

/// Operation name carried by every response
pub const RESPONSE_OPER: &str = "RESPONSE";

/// A response to send to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub oper: String,

    /// Node id copied from the request
    pub nodeid: u64,

    /// Echo tag of the request this answers
    pub echo: u64,

    /// Values for read operations
    pub result: Option<ResultMap>,

    /// Error text; encoded as nil on success
    pub error: Option<String>,
}

impl Response {
    /// Create a successful response
    pub fn ok(nodeid: u64, echo: u64, result: Option<ResultMap>) -> Self {
        Self {
            oper: RESPONSE_OPER.to_string(),
            nodeid,
            echo,
            result,
            error: None,
        }
    }

    /// Create an error response
    pub fn error(nodeid: u64, echo: u64, error: &MpdbError) -> Self {
        Self {
            oper: RESPONSE_OPER.to_string(),
            nodeid,
            echo,
            result: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
