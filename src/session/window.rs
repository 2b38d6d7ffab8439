//! Echo window state machine
//!
//! Pure bookkeeping with no I/O, so the delivery rules can be driven
//! directly in tests.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::protocol::Envelope;

/// How an arriving envelope was classified
#[derive(Debug, Clone, PartialEq)]
pub enum Arrival {
    /// Below the window: already acknowledged, dropped
    Stale,

    /// Inside the window but already committed; carries the cached
    /// response to send again
    Duplicate(Option<Bytes>),

    /// Inside the window, cached and handed to the commit queue
    Accepted,

    /// Beyond the window; the window advanced by `by` to admit it
    Advanced { by: u64 },

    /// Beyond the window by more than the committed slack, dropped
    Refused { diff: u64, slack: u64 },
}

impl Arrival {
    /// Whether the envelope should be handed to the commit queue
    pub fn is_queued(&self) -> bool {
        matches!(self, Arrival::Accepted | Arrival::Advanced { .. })
    }
}

/// Sliding window over echo tags
///
/// Invariants:
/// - `start - 1 <= last_committed <= start + size - 1`
/// - `cached` only holds tags in `(last_committed, start + size)`
/// - `responses` only holds tags in `[start, last_committed]`
#[derive(Debug)]
pub struct Window {
    /// Lowest tag not yet acknowledged by window advancement
    start: u64,
    /// Capacity
    size: u64,
    /// Highest tag applied to the engine
    last_committed: u64,
    /// Accepted envelopes waiting for their turn
    cached: BTreeMap<u64, Envelope>,
    /// Encoded responses kept for retransmission
    responses: BTreeMap<u64, Bytes>,
}

impl Window {
    /// Create a window starting at tag 1
    pub fn new(size: u64) -> Self {
        Self {
            start: 1,
            size,
            last_committed: 0,
            cached: BTreeMap::new(),
            responses: BTreeMap::new(),
        }
    }

    /// Classify an arriving envelope, caching it when admitted
    pub fn admit(&mut self, envelope: Envelope) -> Arrival {
        let echo = envelope.echo;
        let end = self.end();

        if echo < self.start {
            return Arrival::Stale;
        }

        if echo < end {
            if echo <= self.last_committed {
                return Arrival::Duplicate(self.responses.get(&echo).cloned());
            }
            self.cached.insert(echo, envelope);
            return Arrival::Accepted;
        }

        // Advancing retires committed-but-unacknowledged slots; there must
        // be at least `diff` of them.
        let diff = echo - (end - 1);
        let slack = self.last_committed + 1 - self.start;
        if diff > slack {
            return Arrival::Refused { diff, slack };
        }

        self.start += diff;
        let start = self.start;
        self.responses.retain(|&tag, _| tag >= start);
        self.cached.retain(|&tag, _| tag >= start);
        self.cached.insert(echo, envelope);

        Arrival::Advanced { by: diff }
    }

    /// Claim a dequeued envelope if it is exactly the next tag to commit
    pub fn take_if_next(&mut self, envelope: Envelope) -> Option<Envelope> {
        let next = self.last_committed + 1;
        if envelope.echo != next || next >= self.end() {
            return None;
        }
        self.cached.remove(&next);
        Some(envelope)
    }

    /// Claim the next tag from the cache, stopping at a gap or the window end
    pub fn take_next(&mut self) -> Option<Envelope> {
        let next = self.last_committed + 1;
        if next >= self.end() {
            return None;
        }
        self.cached.remove(&next)
    }

    /// Record that `echo` was applied and what was answered
    pub fn record_commit(&mut self, echo: u64, response: Bytes) {
        debug_assert_eq!(echo, self.last_committed + 1);
        self.last_committed = echo;
        self.cached.remove(&echo);
        self.responses.insert(echo, response);
    }

    /// Responses for `[start, last_committed]`, in tag order
    pub fn unacknowledged(&self) -> Vec<Bytes> {
        if self.last_committed < self.start {
            return Vec::new();
        }
        self.responses
            .range(self.start..=self.last_committed)
            .map(|(_, response)| response.clone())
            .collect()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn last_committed(&self) -> u64 {
        self.last_committed
    }

    /// Number of envelopes waiting in the cache
    pub fn pending(&self) -> usize {
        self.cached.len()
    }

    /// Number of responses held for retransmission
    pub fn cached_responses(&self) -> usize {
        self.responses.len()
    }

    /// Check the window bounds (used by tests and debug assertions)
    pub fn invariants_hold(&self) -> bool {
        let unacked = self.last_committed + 1 - self.start;
        self.start <= self.last_committed + 1
            && self.last_committed < self.end()
            && unacked <= self.size
            && self.cached.keys().all(|&t| t > self.last_committed && t < self.end())
            && self.responses.keys().all(|&t| t >= self.start && t <= self.last_committed)
    }

    /// One past the highest tag the window buffers
    fn end(&self) -> u64 {
        self.start.saturating_add(self.size)
    }
}
