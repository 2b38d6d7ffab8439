//! Session Module
//!
//! Per-client reliable delivery over an unreliable datagram transport.
//!
//! ## Responsibilities
//! - Classify each arriving echo tag against a sliding window
//! - Commit operations to the engine strictly in echo order, exactly once
//! - Cache responses and resend them until the window moves past them
//!
//! ## Echo Window
//! ```text
//!            window                    window + size
//!              │                             │
//!   stale      ▼  committed   │  pending     ▼   advance candidates
//! ─────────────┼──────────────┼──────────────┼───────────────────────▶ echo
//!              │◀─ resent ───▶│◀─ cached ───▶│
//!                       lastCommitted
//! ```
//!
//! There is no explicit acknowledgment message: a tag beyond the window
//! acknowledges older responses by moving the window forward, and only
//! as far as the server has committed.
//!
//! ## Threads
//! - Dispatch loop: runs `SessionCore::ingest` (classification only)
//! - One worker per session: commits queued envelopes and fires resends

mod state;
mod window;
mod worker;

use std::net::{IpAddr, SocketAddr};

pub use state::SessionCore;
pub use window::{Arrival, Window};
pub use worker::Session;

/// Derive a node id from the last four bytes of a peer address
///
/// IPv4 peers are viewed through their IPv4-mapped IPv6 form, so the four
/// bytes are the IPv4 octets.
pub fn derive_node_id(addr: &SocketAddr) -> u64 {
    let octets = match addr.ip() {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        IpAddr::V6(v6) => v6.octets(),
    };

    (octets[12] as u64) << 12
        | (octets[13] as u64) << 8
        | (octets[14] as u64) << 4
        | octets[15] as u64
}
