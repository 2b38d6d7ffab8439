//! Shared helpers for session and server tests

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mpdb::config::WalSyncStrategy;
use mpdb::engine::DataMap;
use mpdb::network::Transport;
use mpdb::protocol::{decode_response, Envelope, Request, Response};
use mpdb::record::Scalar;
use mpdb::{Config, Engine};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Transport that records every datagram sent and never receives
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        self.sent.lock().clone()
    }

    pub fn sent_bytes(&self) -> Vec<Vec<u8>> {
        self.sent.lock().iter().map(|(_, b)| b.clone()).collect()
    }

    pub fn responses(&self) -> Vec<Response> {
        self.sent
            .lock()
            .iter()
            .map(|(_, bytes)| decode_response(bytes).unwrap())
            .collect()
    }

    pub fn echoes(&self) -> Vec<u64> {
        self.responses().iter().map(|r| r.echo).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    /// Wait until at least `count` datagrams were sent
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.sent.lock().len() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }
}

impl Transport for RecordingTransport {
    fn recv_from(&self, _buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        thread::sleep(Duration::from_millis(5));
        Err(io::Error::new(io::ErrorKind::WouldBlock, "no datagrams"))
    }

    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.sent.lock().push((target, buf.to_vec()));
        Ok(buf.len())
    }
}

pub fn setup_engine() -> (TempDir, Arc<Engine>) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, Arc::new(engine))
}

pub fn data(pairs: &[(&str, Scalar)]) -> DataMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// An INSERT writing `log.last = echo`
pub fn insert_envelope(nodeid: u64, echo: u64) -> Envelope {
    Envelope::new(
        nodeid,
        echo,
        Request::Insert {
            data: data(&[("log.last", echo.into())]),
        },
    )
}
