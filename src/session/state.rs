//! Session state
//!
//! Owns one client's window and turns committed envelopes into engine
//! calls and responses.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::engine::{node_bucket, Engine, ResultMap};
use crate::error::{MpdbError, Result};
use crate::network::Transport;
use crate::protocol::{encode_response, Envelope, OperationType, Request, Response};

use super::{derive_node_id, Arrival, Window};

/// State shared between the dispatch loop and a session worker
pub struct SessionCore {
    addr: SocketAddr,
    node_id: u64,
    window: Mutex<Window>,
    engine: Arc<Engine>,
    transport: Arc<dyn Transport>,
}

impl SessionCore {
    pub fn new(
        addr: SocketAddr,
        window_size: u64,
        engine: Arc<Engine>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::resume(addr, Window::new(window_size), engine, transport)
    }

    /// Rebuild a session around a window kept from an earlier one
    pub fn resume(
        addr: SocketAddr,
        window: Window,
        engine: Arc<Engine>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            addr,
            node_id: derive_node_id(&addr),
            window: Mutex::new(window),
            engine,
            transport,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Run `f` against the window under its lock
    pub fn with_window<T>(&self, f: impl FnOnce(&Window) -> T) -> T {
        f(&self.window.lock())
    }

    /// Move the window out, leaving a fresh one of the same size
    pub(crate) fn take_window(&self) -> Window {
        let mut window = self.window.lock();
        let size = window.size();
        std::mem::replace(&mut *window, Window::new(size))
    }

    /// Classify an arriving envelope
    ///
    /// Committed duplicates are answered here from the response cache; the
    /// caller queues the envelope when `Arrival::is_queued` holds.
    pub fn ingest(&self, envelope: Envelope) -> Arrival {
        let echo = envelope.echo;
        let arrival = self.window.lock().admit(envelope);

        match &arrival {
            Arrival::Stale => trace!("{}: stale echo {}", self.addr, echo),
            Arrival::Duplicate(Some(response)) => {
                debug!("{}: duplicate echo {}, resending", self.addr, echo);
                self.send(response);
            }
            Arrival::Duplicate(None) => {}
            Arrival::Accepted => trace!("{}: accepted echo {}", self.addr, echo),
            Arrival::Advanced { by } => {
                debug!("{}: echo {} advanced window by {}", self.addr, echo, by)
            }
            Arrival::Refused { diff, slack } => debug!(
                "{}: refused echo {} (needs {}, committed slack {})",
                self.addr, echo, diff, slack
            ),
        }

        arrival
    }

    /// Commit a dequeued envelope if it is next in line, then drain any
    /// contiguous run of cached successors
    ///
    /// Returns the number of envelopes committed. The engine runs without
    /// the window lock held.
    pub fn commit(&self, envelope: Envelope) -> usize {
        let mut next = self.window.lock().take_if_next(envelope);
        let mut committed = 0;

        while let Some(envelope) = next {
            let echo = envelope.echo;
            let response = self.apply(&envelope);
            let bytes = self.encode(&response);
            self.send(&bytes);

            let mut window = self.window.lock();
            window.record_commit(echo, bytes);
            debug_assert!(window.invariants_hold());
            committed += 1;
            next = window.take_next();
        }

        committed
    }

    /// Resend every committed response the client has not acknowledged
    pub fn resend(&self) -> usize {
        let pending = self.window.lock().unacknowledged();
        for response in &pending {
            self.send(response);
        }
        if !pending.is_empty() {
            trace!("{}: resent {} responses", self.addr, pending.len());
        }
        pending.len()
    }

    /// Execute a request against the engine
    fn apply(&self, envelope: &Envelope) -> Response {
        let result = match &envelope.request {
            Request::Persist { data } => self
                .authorize(envelope.nodeid)
                .and_then(|bucket| self.engine.persist(&bucket, data))
                .map(|_| None),
            Request::GetPersist { keys } => self
                .authorize(envelope.nodeid)
                .and_then(|bucket| self.engine.get_persist(&bucket, keys))
                .map(Some),
            Request::Insert { data } => self.engine.insert(data).map(|_| None),
            Request::Get { keys } => self.engine.get(keys).map(Some),
            Request::GetBucket { bucket } => self.engine.get_bucket(bucket).map(Some),
            Request::Delete | Request::Subscribe | Request::Unsupported { .. } => {
                warn!("{}: unsupported operation {}", self.addr, envelope.request.oper());
                Err(MpdbError::UnsupportedOperation(envelope.request.oper().to_string()))
            }
            Request::Rejected { oper, reason } => {
                // Private-bucket requests are authorized before their payload is judged
                let authorized = match oper {
                    OperationType::Persist | OperationType::GetPersist => {
                        self.authorize(envelope.nodeid).map(|_| ())
                    }
                    _ => Ok(()),
                };
                authorized.and_then(|_| Err(MpdbError::Encode(reason.clone())))
            }
        };

        respond(envelope, result)
    }

    /// Check that a private-bucket request names this session's node
    fn authorize(&self, requested: u64) -> Result<String> {
        if requested != self.node_id {
            return Err(MpdbError::Authorization {
                session: self.node_id,
                requested,
            });
        }
        Ok(node_bucket(self.node_id))
    }

    fn encode(&self, response: &Response) -> Bytes {
        match encode_response(response) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("{}: failed to encode response {}: {}", self.addr, response.echo, e);
                encode_response(&Response::error(response.nodeid, response.echo, &e))
                    .unwrap_or_default()
            }
        }
    }

    fn send(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Err(e) = self.transport.send_to(bytes, self.addr) {
            warn!("{}: {}", self.addr, MpdbError::Transport(e.to_string()));
        }
    }
}

fn respond(envelope: &Envelope, result: Result<Option<ResultMap>>) -> Response {
    match result {
        Ok(values) => Response::ok(envelope.nodeid, envelope.echo, values),
        Err(e) => {
            debug!("echo {} failed: {}", envelope.echo, e);
            Response::error(envelope.nodeid, envelope.echo, &e)
        }
    }
}
