//! Network Module
//!
//! UDP dispatch and per-peer session routing.
//!
//! ## Architecture
//! - Single dispatch thread reading datagrams
//! - One session (and worker thread) per peer address
//! - Sessions share the engine and the socket

mod registry;
mod server;
mod transport;

pub use registry::SessionRegistry;
pub use server::{Server, ShutdownHandle};
pub use transport::Transport;
