//! mpdb CLI Client
//!
//! Sends one envelope to an mpdb server and prints the response.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use mpdb::engine::DataMap;
use mpdb::protocol::{decode_response, encode_envelope, Envelope, Request, Response};
use mpdb::record::Scalar;
use mpdb::session::derive_node_id;
use mpdb::{MpdbError, Result};

/// mpdb CLI
#[derive(Parser, Debug)]
#[command(name = "mpdb-cli")]
#[command(about = "CLI for the mpdb key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7000")]
    server: String,

    /// Echo tag to send; a fresh session expects 1
    #[arg(short, long, default_value = "1")]
    echo: u64,

    /// Node id to claim (defaults to the one derived from our address)
    #[arg(short, long)]
    nodeid: Option<u64>,

    /// How long to wait for the response, in milliseconds
    #[arg(short, long, default_value = "3000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store key=value pairs in this node's private bucket
    Persist {
        /// Pairs as key=value
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Read keys from this node's private bucket (all keys if none given)
    GetPersist {
        keys: Vec<String>,
    },

    /// Store key=value pairs in shared collections ("col.key=value")
    Insert {
        /// Pairs as key=value
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Read keys from shared collections
    Get {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Read a whole shared collection
    GetBucket {
        /// Collection name
        name: String,
    },
}

fn main() {
    let args = Args::parse();

    match run(args) {
        Ok(response) => {
            print_response(&response);
            if !response.is_ok() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}

fn run(args: Args) -> Result<Response> {
    let server = resolve(&args.server)?;
    let bind_addr = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };

    let socket = UdpSocket::bind(bind_addr)?;
    socket.connect(server)?;

    // The server derives our node id from the address it sees
    let nodeid = match args.nodeid {
        Some(id) => id,
        None => derive_node_id(&socket.local_addr()?),
    };

    let request = match args.command {
        Commands::Persist { pairs } => Request::Persist {
            data: parse_pairs(&pairs)?,
        },
        Commands::GetPersist { keys } => Request::GetPersist { keys },
        Commands::Insert { pairs } => Request::Insert {
            data: parse_pairs(&pairs)?,
        },
        Commands::Get { keys } => Request::Get { keys },
        Commands::GetBucket { name } => Request::GetBucket { bucket: name },
    };

    let envelope = Envelope::new(nodeid, args.echo, request);
    socket.send(&encode_envelope(&envelope)?)?;

    wait_for_response(&socket, args.echo, Duration::from_millis(args.timeout_ms))
}

fn resolve(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()?
        .next()
        .ok_or_else(|| MpdbError::Config(format!("cannot resolve {}", addr)))
}

fn parse_pairs(pairs: &[String]) -> Result<DataMap> {
    let mut data = DataMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| MpdbError::Config(format!("expected key=value, got {:?}", pair)))?;
        data.insert(key.to_string(), Scalar::parse_lossy(value));
    }
    Ok(data)
}

/// Wait for the response carrying `echo`, skipping resends of older ones
fn wait_for_response(socket: &UdpSocket, echo: u64, timeout: Duration) -> Result<Response> {
    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; 65536];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(MpdbError::Transport(format!(
                "no response for echo {} within {:?}",
                echo, timeout
            )));
        }
        socket.set_read_timeout(Some(remaining))?;

        let len = match socket.recv(&mut buf) {
            Ok(len) => len,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(e) => return Err(e.into()),
        };

        let response = decode_response(&buf[..len])?;
        if response.echo == echo {
            return Ok(response);
        }
    }
}

fn print_response(response: &Response) {
    if let Some(error) = &response.error {
        println!("(error) {}", error);
        return;
    }

    match &response.result {
        None => println!("OK"),
        Some(values) if values.is_empty() => println!("(empty)"),
        Some(values) => {
            for (key, value) in values {
                match value {
                    Some(value) => println!("{} = {}", key, value),
                    None => println!("{} = (nil)", key),
                }
            }
        }
    }
}
