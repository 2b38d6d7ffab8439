//! Tests for the UDP server
//!
//! These tests verify:
//! - Datagrams are routed to one session per peer
//! - Malformed datagrams are dropped without a reply
//! - The full request/response cycle over a real socket
//! - Idle sessions are evicted and resume where they stopped

mod common;

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mpdb::config::WalSyncStrategy;
use mpdb::network::{Server, SessionRegistry};
use mpdb::protocol::{decode_response, encode_envelope, Envelope, Request, Response};
use mpdb::record::Scalar;
use mpdb::session::{derive_node_id, Arrival};
use mpdb::{Config, Engine};
use tempfile::TempDir;

use common::{data, insert_envelope, setup_engine, RecordingTransport};

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .listen_addr("127.0.0.1:0")
        .poll_interval_ms(20)
        .resend_interval_ms(200)
        .build()
}

fn client() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    socket
}

/// Send an envelope and wait for the response carrying its echo
fn call(socket: &UdpSocket, server: SocketAddr, envelope: &Envelope) -> Response {
    socket
        .send_to(&encode_envelope(envelope).unwrap(), server)
        .unwrap();

    let mut buf = [0u8; 4096];
    loop {
        let (len, _) = socket.recv_from(&mut buf).unwrap();
        let response = decode_response(&buf[..len]).unwrap();
        if response.echo == envelope.echo {
            return response;
        }
    }
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_dispatch_routes_by_peer() {
    let temp_dir = TempDir::new().unwrap();
    let (_engine_dir, engine) = setup_engine();
    let transport = RecordingTransport::new();
    let mut server =
        Server::with_transport(test_config(&temp_dir), engine, transport.clone()).unwrap();

    let a: SocketAddr = "10.0.0.1:4000".parse().unwrap();
    let b: SocketAddr = "10.0.0.2:4000".parse().unwrap();
    let bytes = encode_envelope(&insert_envelope(1, 1)).unwrap();

    assert_eq!(server.dispatch(&bytes, a), Some(Arrival::Accepted));
    assert_eq!(server.dispatch(&bytes, b), Some(Arrival::Accepted));
    assert_eq!(server.registry().len(), 2);
    assert_eq!(
        server.registry().get(&a).unwrap().node_id(),
        derive_node_id(&a)
    );

    assert!(transport.wait_for(2, Duration::from_secs(5)));
    let mut targets: Vec<SocketAddr> = transport.sent().iter().map(|(t, _)| *t).collect();
    targets.sort();
    assert_eq!(targets, vec![a, b]);
}

#[test]
fn test_dispatch_drops_malformed_datagrams() {
    let temp_dir = TempDir::new().unwrap();
    let (_engine_dir, engine) = setup_engine();
    let transport = RecordingTransport::new();
    let mut server =
        Server::with_transport(test_config(&temp_dir), engine, transport.clone()).unwrap();
    let from: SocketAddr = "10.0.0.1:4000".parse().unwrap();

    assert_eq!(server.dispatch(b"\x93\x01\x02", from), None);
    assert_eq!(server.dispatch(&[], from), None);

    assert!(server.registry().is_empty());
    assert!(transport.sent().is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (_engine_dir, engine) = setup_engine();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .window_size(0)
        .build();

    let result = Server::with_transport(config, engine, RecordingTransport::new());
    assert!(result.is_err());
}

#[test]
fn test_run_stops_on_shutdown() {
    let temp_dir = TempDir::new().unwrap();
    let (_engine_dir, engine) = setup_engine();
    let mut server =
        Server::with_transport(test_config(&temp_dir), engine, RecordingTransport::new())
            .unwrap();
    let handle = server.shutdown_handle();

    let runner = thread::spawn(move || server.run());
    thread::sleep(Duration::from_millis(50));
    handle.shutdown();

    assert!(handle.is_shutdown());
    runner.join().unwrap().unwrap();
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_registry_evicts_idle_sessions() {
    let temp_dir = TempDir::new().unwrap();
    let (_engine_dir, engine) = setup_engine();
    let mut registry =
        SessionRegistry::new(&test_config(&temp_dir), engine, RecordingTransport::new());

    let a: SocketAddr = "10.0.0.1:1".parse().unwrap();
    registry.get_or_create(a).unwrap();
    registry.get_or_create(a).unwrap();
    assert_eq!(registry.len(), 1);

    assert_eq!(registry.evict_idle(Duration::from_secs(60)), 0);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(registry.evict_idle(Duration::from_millis(10)), 1);
    assert!(registry.is_empty());
}

#[test]
fn test_evicted_client_resumes_its_echo_sequence() {
    let temp_dir = TempDir::new().unwrap();
    let (_engine_dir, engine) = setup_engine();
    let transport = RecordingTransport::new();
    let mut registry = SessionRegistry::new(
        &test_config(&temp_dir),
        Arc::clone(&engine),
        transport.clone(),
    );

    let a: SocketAddr = "10.0.0.1:1".parse().unwrap();
    for echo in 1..=5 {
        let arrival = registry
            .get_or_create(a)
            .unwrap()
            .handle(insert_envelope(1, echo));
        assert!(arrival.is_queued());
    }
    assert!(transport.wait_for(5, Duration::from_secs(5)));

    thread::sleep(Duration::from_millis(30));
    assert_eq!(registry.evict_idle(Duration::from_millis(10)), 1);
    assert!(registry.is_empty());
    assert_eq!(registry.retired_len(), 1);

    // A fresh window would refuse echo 6 outright
    transport.clear();
    let session = registry.get_or_create(a).unwrap();
    assert_eq!(session.core().with_window(|w| w.last_committed()), 5);
    let arrival = session.handle(insert_envelope(1, 6));
    assert!(arrival.is_queued());
    assert_eq!(registry.retired_len(), 0);

    assert!(transport.wait_for(1, Duration::from_secs(5)));
    assert!(transport.echoes().contains(&6));
    assert_eq!(
        engine.get(&["log.last".to_string()]).unwrap()["log.last"],
        Some(Scalar::from(6u64))
    );

    // Already committed echoes are still answered from the cache
    let duplicate = registry
        .get_or_create(a)
        .unwrap()
        .handle(insert_envelope(1, 3));
    assert!(matches!(duplicate, Arrival::Duplicate(Some(_))));
}

#[test]
fn test_idle_sessions_swept_by_run() {
    let temp_dir = TempDir::new().unwrap();
    let (_engine_dir, engine) = setup_engine();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .poll_interval_ms(10)
        .session_idle_timeout_ms(Some(30))
        .build();
    let mut server =
        Server::with_transport(config, Arc::clone(&engine), RecordingTransport::new()).unwrap();

    let from: SocketAddr = "10.0.0.9:1".parse().unwrap();
    let bytes = encode_envelope(&insert_envelope(1, 1)).unwrap();
    server.dispatch(&bytes, from);
    assert_eq!(server.registry().len(), 1);
    // Ours, the registry's and the session's
    assert_eq!(Arc::strong_count(&engine), 3);

    let handle = server.shutdown_handle();
    let runner = thread::spawn(move || server.run());
    thread::sleep(Duration::from_millis(200));

    // Evicted while the loop is still running
    assert_eq!(Arc::strong_count(&engine), 2);

    handle.shutdown();
    runner.join().unwrap().unwrap();
}

// =============================================================================
// End-to-End Tests
// =============================================================================

#[test]
fn test_end_to_end_over_udp() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let engine = Arc::new(Engine::open(config.clone()).unwrap());

    let mut server = Server::bind(config, Arc::clone(&engine)).unwrap();
    let server_addr = server.local_addr().unwrap();
    let handle = server.shutdown_handle();
    let runner = thread::spawn(move || server.run());

    let socket = client();
    let node = derive_node_id(&socket.local_addr().unwrap());

    // PERSIST / GETPERSIST
    let response = call(
        &socket,
        server_addr,
        &Envelope::new(
            node,
            1,
            Request::Persist {
                data: data(&[("a", 3u64.into()), ("b", "four".into())]),
            },
        ),
    );
    assert!(response.is_ok(), "{:?}", response.error);

    let response = call(
        &socket,
        server_addr,
        &Envelope::new(node, 2, Request::GetPersist { keys: Vec::new() }),
    );
    let result = response.result.unwrap();
    assert_eq!(result["a"], Some(Scalar::U64(3)));
    assert_eq!(result["b"], Some(Scalar::from("four")));

    // INSERT / GET / GETBUCKET
    let response = call(
        &socket,
        server_addr,
        &Envelope::new(
            node,
            3,
            Request::Insert {
                data: data(&[("col.a", 1u64.into()), ("col2.c", "hello".into())]),
            },
        ),
    );
    assert!(response.is_ok());

    let response = call(
        &socket,
        server_addr,
        &Envelope::new(
            node,
            4,
            Request::Get {
                keys: vec!["col.a".to_string(), "col2.c".to_string()],
            },
        ),
    );
    let result = response.result.unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result["col2.c"], Some(Scalar::from("hello")));

    let response = call(
        &socket,
        server_addr,
        &Envelope::new(
            node,
            5,
            Request::GetBucket {
                bucket: "col".to_string(),
            },
        ),
    );
    let result = response.result.unwrap();
    assert_eq!(result.keys().collect::<Vec<_>>(), vec!["col.a"]);

    // Another node's private bucket is off limits
    let response = call(
        &socket,
        server_addr,
        &Envelope::new(
            node + 1,
            6,
            Request::Persist {
                data: data(&[("x", 1u64.into())]),
            },
        ),
    );
    assert!(response.error.unwrap().contains("cannot access"));

    handle.shutdown();
    runner.join().unwrap().unwrap();

    assert!(engine.get_persist(&(node + 1).to_string(), &[]).is_err());
}

#[test]
fn test_lost_response_is_resent() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let engine = Arc::new(Engine::open(config.clone()).unwrap());

    let mut server = Server::bind(config, engine).unwrap();
    let server_addr = server.local_addr().unwrap();
    let handle = server.shutdown_handle();
    let runner = thread::spawn(move || server.run());

    let socket = client();
    let first = call(&socket, server_addr, &insert_envelope(1, 1));

    // Ignore the first reply; the resend timer delivers it again
    let mut buf = [0u8; 4096];
    let (len, _) = socket.recv_from(&mut buf).unwrap();
    let again = decode_response(&buf[..len]).unwrap();
    assert_eq!(again, first);

    handle.shutdown();
    runner.join().unwrap().unwrap();
}
