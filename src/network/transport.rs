//! Datagram transport
//!
//! The seam between sessions and the socket, so tests can observe what a
//! session sends.

use std::io;
use std::net::{SocketAddr, UdpSocket};

/// A connectionless, message-oriented transport
pub trait Transport: Send + Sync {
    /// Receive one datagram; may time out with `WouldBlock` or `TimedOut`
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Send one datagram to `target`
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;
}

impl Transport for UdpSocket {
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }

    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target)
    }
}
