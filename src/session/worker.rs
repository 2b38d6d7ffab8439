//! Session worker thread

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::error::Result;
use crate::network::Transport;
use crate::protocol::Envelope;

use super::{Arrival, SessionCore, Window};

/// Handle to a client session and its worker
///
/// Dropping the handle closes the queue and joins the worker.
pub struct Session {
    core: Arc<SessionCore>,
    queue: Option<Sender<Envelope>>,
    worker: Option<JoinHandle<()>>,
    last_seen: Instant,
}

impl Session {
    /// Create the session state and start its worker
    pub fn spawn(
        addr: SocketAddr,
        window_size: u64,
        resend_interval: Duration,
        engine: Arc<Engine>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        Self::resume(addr, Window::new(window_size), resend_interval, engine, transport)
    }

    /// Start a worker over a window retired by an earlier session
    ///
    /// Committed echoes stay answered from the cache and the next echo
    /// the client sends continues where the old session stopped.
    pub fn resume(
        addr: SocketAddr,
        window: Window,
        resend_interval: Duration,
        engine: Arc<Engine>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let core = Arc::new(SessionCore::resume(addr, window, engine, transport));
        let (tx, rx) = channel::unbounded();

        let worker_core = Arc::clone(&core);
        let worker = thread::Builder::new()
            .name(format!("session-{}", addr))
            .spawn(move || run_worker(worker_core, rx, resend_interval))?;

        debug!("Session opened for {} (node {})", addr, core.node_id());

        Ok(Self {
            core,
            queue: Some(tx),
            worker: Some(worker),
            last_seen: Instant::now(),
        })
    }

    /// Classify an envelope and queue it for commit when admitted
    pub fn handle(&mut self, envelope: Envelope) -> Arrival {
        self.last_seen = Instant::now();

        let arrival = self.core.ingest(envelope.clone());
        if arrival.is_queued() {
            if let Some(queue) = &self.queue {
                if queue.send(envelope).is_err() {
                    warn!("{}: session worker is gone", self.core.addr());
                }
            }
        }
        arrival
    }

    pub fn core(&self) -> &SessionCore {
        &self.core
    }

    pub fn addr(&self) -> SocketAddr {
        self.core.addr()
    }

    pub fn node_id(&self) -> u64 {
        self.core.node_id()
    }

    /// Time since the last envelope arrived
    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Stop the worker and hand back the window
    ///
    /// Envelopes already queued are committed first.
    pub fn retire(mut self) -> Window {
        self.stop();
        self.core.take_window()
    }

    fn stop(&mut self) {
        // Disconnecting the queue ends the worker loop
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("{}: session worker panicked", self.core.addr());
            }
            debug!("Session closed for {}", self.core.addr());
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(core: Arc<SessionCore>, queue: Receiver<Envelope>, resend_interval: Duration) {
    let ticker = channel::tick(resend_interval);

    loop {
        crossbeam::select! {
            recv(queue) -> msg => match msg {
                Ok(envelope) => {
                    core.commit(envelope);
                }
                Err(_) => break,
            },
            recv(ticker) -> _ => {
                core.resend();
            }
        }
    }
}
