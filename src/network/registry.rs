//! Session registry
//!
//! Peer address → session, created on first contact. Evicted sessions
//! leave their window behind so a returning peer resumes its echo sequence.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::session::{Session, Window};

use super::Transport;

/// Most windows kept for evicted peers; the oldest goes first
const MAX_RETIRED_WINDOWS: usize = 1024;

/// All live sessions, owned by the dispatch loop
pub struct SessionRegistry {
    sessions: HashMap<SocketAddr, Session>,
    /// Windows of evicted sessions, with the time they were retired
    retired: HashMap<SocketAddr, (Window, Instant)>,
    engine: Arc<Engine>,
    transport: Arc<dyn Transport>,
    window_size: u64,
    resend_interval: Duration,
}

impl SessionRegistry {
    pub fn new(config: &Config, engine: Arc<Engine>, transport: Arc<dyn Transport>) -> Self {
        Self {
            sessions: HashMap::new(),
            retired: HashMap::new(),
            engine,
            transport,
            window_size: config.window_size,
            resend_interval: config.resend_interval(),
        }
    }

    /// Session for `addr`, spawning one if this peer is new
    ///
    /// A peer evicted earlier gets its old window back.
    pub fn get_or_create(&mut self, addr: SocketAddr) -> Result<&mut Session> {
        match self.sessions.entry(addr) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let engine = Arc::clone(&self.engine);
                let transport = Arc::clone(&self.transport);
                let session = match self.retired.remove(&addr) {
                    Some((window, _)) => {
                        info!(
                            "Client {} returned, resuming at echo {}",
                            addr,
                            window.last_committed() + 1
                        );
                        Session::resume(addr, window, self.resend_interval, engine, transport)?
                    }
                    None => {
                        let session = Session::spawn(
                            addr,
                            self.window_size,
                            self.resend_interval,
                            engine,
                            transport,
                        )?;
                        info!("New client {} (node {})", addr, session.node_id());
                        session
                    }
                };
                Ok(entry.insert(session))
            }
        }
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&Session> {
        self.sessions.get(addr)
    }

    /// Stop sessions silent for at least `ttl`; returns how many were evicted
    ///
    /// Their windows are retired, not discarded.
    pub fn evict_idle(&mut self, ttl: Duration) -> usize {
        let idle: Vec<SocketAddr> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.idle_for() >= ttl)
            .map(|(addr, _)| *addr)
            .collect();

        for addr in &idle {
            if let Some(session) = self.sessions.remove(addr) {
                info!("Evicting idle client {}", addr);
                let window = session.retire();
                self.retire_window(*addr, window);
            }
        }
        idle.len()
    }

    fn retire_window(&mut self, addr: SocketAddr, window: Window) {
        if self.retired.len() >= MAX_RETIRED_WINDOWS {
            let oldest = self
                .retired
                .iter()
                .min_by_key(|(_, (_, retired_at))| *retired_at)
                .map(|(addr, _)| *addr);
            if let Some(oldest) = oldest {
                debug!("Forgetting window of {}", oldest);
                self.retired.remove(&oldest);
            }
        }
        self.retired.insert(addr, (window, Instant::now()));
    }

    /// Number of evicted peers whose window is still kept
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session, joining their workers
    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}
