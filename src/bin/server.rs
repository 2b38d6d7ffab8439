//! mpdb Server Binary
//!
//! Starts the UDP server for mpdb.

use std::sync::Arc;

use clap::Parser;
use mpdb::network::Server;
use mpdb::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// mpdb Server
#[derive(Parser, Debug)]
#[command(name = "mpdb-server")]
#[command(about = "Collection key-value store for embedded clients, over UDP")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./mpdb_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "[::]:7000")]
    listen: String,

    /// Echo window size per client
    #[arg(short, long, default_value = "5")]
    window_size: u64,

    /// Resend interval for unacknowledged responses, in milliseconds
    #[arg(short, long, default_value = "3000")]
    resend_ms: u64,

    /// Evict clients silent for this many milliseconds (never by default)
    #[arg(short, long)]
    idle_timeout_ms: Option<u64>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mpdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("mpdb Server v{}", mpdb::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .window_size(args.window_size)
        .resend_interval_ms(args.resend_ms)
        .session_idle_timeout_ms(args.idle_timeout_ms)
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(2);
    }

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Engine initialized successfully ({} buckets)",
        engine.bucket_count()
    );

    let mut server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    // Sessions hold engine references until the server is gone
    drop(server);
    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let Err(e) = engine.close() {
                tracing::error!("Failed to close engine: {}", e);
            }
        }
        Err(_) => tracing::warn!("Engine still shared at exit, skipping checkpoint"),
    }

    tracing::info!("Server stopped");
}
