//! hotkv Server Binary
//!
//! Loads (or waits for) a mapping and serves lookups over TCP.

use std::sync::Arc;

use clap::Parser;
use hotkv::network::Server;
use hotkv::{Config, MappingStore};
use tracing_subscriber::{fmt, EnvFilter};

/// hotkv Server
#[derive(Parser, Debug)]
#[command(name = "hotkv-server")]
#[command(about = "Hot-reloadable key-value lookup server")]
#[command(version)]
struct Args {
    /// Two-column mapping file to load and watch (omit to accept pushes instead)
    #[arg(short = 'f', long)]
    mapping: Option<String>,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7420")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Largest accepted push in MB
    #[arg(long, default_value = "8")]
    max_push_mb: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hotkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("hotkv Server v{}", hotkv::VERSION);
    match &args.mapping {
        Some(path) => tracing::info!("Mapping file: {}", path),
        None => tracing::info!("Mapping file: none (push-only)"),
    }
    tracing::info!("Listen address: {}", args.listen);

    let mut builder = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .max_push_bytes(args.max_push_mb * 1024 * 1024);
    if let Some(path) = &args.mapping {
        builder = builder.source_path(path);
    }
    let config = builder.build();

    let store = match MappingStore::open(config.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(entries = store.len(), mode = ?store.mode(), "Store initialized");

    let mut server = match Server::bind(config, Arc::clone(&store)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            store.shutdown();
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C / SIGTERM handler
    if let Err(e) = server.shutdown_handle().on_termination_signal() {
        tracing::warn!("Failed to install signal handler: {}", e);
    }

    // Returns after a signal, with the store's watcher already stopped
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
