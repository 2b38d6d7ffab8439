//! UDP Server
//!
//! Reads datagrams and dispatches them to per-peer sessions.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::decode_envelope;
use crate::session::Arrival;

use super::{SessionRegistry, Transport};

/// UDP server for mpdb
pub struct Server {
    config: Config,
    transport: Arc<dyn Transport>,
    registry: SessionRegistry,
    local_addr: Option<SocketAddr>,
    shutdown: Arc<AtomicBool>,
    last_sweep: Instant,
}

/// Stops a running server from another thread
#[derive(Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Server {
    /// Bind a UDP socket on `config.listen_addr`
    ///
    /// The socket read timeout is the poll interval, so `run` notices a
    /// shutdown request within one interval.
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        config.validate()?;

        let socket = UdpSocket::bind(&config.listen_addr)?;
        socket.set_read_timeout(Some(config.poll_interval()))?;
        let local_addr = socket.local_addr()?;
        info!("Listening on udp://{}", local_addr);

        let mut server = Self::with_transport(config, engine, Arc::new(socket))?;
        server.local_addr = Some(local_addr);
        Ok(server)
    }

    /// Build a server over an existing transport
    pub fn with_transport(
        config: Config,
        engine: Arc<Engine>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;

        let registry = SessionRegistry::new(&config, engine, Arc::clone(&transport));
        Ok(Self {
            config,
            transport,
            registry,
            local_addr: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            last_sweep: Instant::now(),
        })
    }

    /// Start the dispatch loop (blocking)
    pub fn run(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.config.max_datagram_size];

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.transport.recv_from(&mut buf) {
                Ok((len, from)) => {
                    self.dispatch(&buf[..len], from);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(e) => warn!("Receive failed: {}", e),
            }

            self.sweep_idle();
        }

        info!("Shutting down, closing {} sessions", self.registry.len());
        self.registry.clear();
        Ok(())
    }

    /// Route one datagram to its sender's session
    ///
    /// Returns `None` when the datagram was dropped before reaching a
    /// session.
    pub fn dispatch(&mut self, datagram: &[u8], from: SocketAddr) -> Option<Arrival> {
        let envelope = match decode_envelope(datagram) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Dropping datagram from {}: {}", from, e);
                return None;
            }
        };

        match self.registry.get_or_create(from) {
            Ok(session) => Some(session.handle(envelope)),
            Err(e) => {
                error!("Failed to open session for {}: {}", from, e);
                None
            }
        }
    }

    /// Get a handle that stops `run`
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Signal the server to shut down
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Bound socket address (`None` for a custom transport)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    fn sweep_idle(&mut self) {
        let Some(ttl) = self.config.session_idle_timeout() else {
            return;
        };
        if self.last_sweep.elapsed() < self.config.poll_interval() {
            return;
        }
        self.last_sweep = Instant::now();

        let evicted = self.registry.evict_idle(ttl);
        if evicted > 0 {
            debug!("Evicted {} idle sessions", evicted);
        }
    }
}
