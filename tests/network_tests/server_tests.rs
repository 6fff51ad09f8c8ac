//! Server Tests
//!
//! Drive a real server over TCP on an ephemeral port.

use std::fs;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use hotkv::config::Config;
use hotkv::network::{Server, ShutdownHandle};
use hotkv::protocol::{decode_stats, read_response, write_command, Command, Response, Status};
use hotkv::{MappingStore, SourceMode};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

struct Running {
    addr: SocketAddr,
    handle: ShutdownHandle,
    thread: Option<JoinHandle<()>>,
}

impl Running {
    fn stop(&mut self) {
        self.handle.shutdown();
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.stop();
    }
}

fn start(store: MappingStore, config: Config) -> Running {
    start_shared(Arc::new(store), config)
}

fn start_shared(store: Arc<MappingStore>, config: Config) -> Running {
    let mut server = Server::bind(config, store).unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.shutdown_handle();

    let thread = thread::spawn(move || {
        server.run().unwrap();
    });

    Running {
        addr,
        handle,
        thread: Some(thread),
    }
}

fn ephemeral() -> Config {
    Config::builder().listen_addr("127.0.0.1:0").build()
}

fn start_push_only() -> Running {
    let config = ephemeral();
    let store = MappingStore::open(config.clone()).unwrap();
    start(store, config)
}

fn send(stream: &mut TcpStream, command: Command) -> Response {
    write_command(stream, &command).unwrap();
    read_response(stream).unwrap()
}

fn lookup(stream: &mut TcpStream, key: &str) -> Response {
    send(
        stream,
        Command::Lookup {
            key: key.to_string(),
        },
    )
}

fn push(stream: &mut TcpStream, document: &str) -> Response {
    send(
        stream,
        Command::Push {
            document: document.as_bytes().to_vec(),
        },
    )
}

// =============================================================================
// Push-only Server
// =============================================================================

#[test]
fn test_ping() {
    let server = start_push_only();
    let mut stream = TcpStream::connect(server.addr).unwrap();

    let response = send(&mut stream, Command::Ping);

    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.message().as_deref(), Some("PONG"));
}

#[test]
fn test_push_then_lookup() {
    let server = start_push_only();
    let mut stream = TcpStream::connect(server.addr).unwrap();

    assert_eq!(lookup(&mut stream, "ABC123").status, Status::NotFound);

    let response = push(&mut stream, "ABC123,alice\nXYZ789,bob\n");
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.message().as_deref(), Some("2"));

    let response = lookup(&mut stream, "ABC123");
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.message().as_deref(), Some("alice"));
}

#[test]
fn test_malformed_push_is_invalid() {
    let server = start_push_only();
    let mut stream = TcpStream::connect(server.addr).unwrap();
    push(&mut stream, "ABC123,alice\n");

    let response = push(&mut stream, "ABC123,carol\nbroken\n");

    assert_eq!(response.status, Status::Invalid);
    assert!(response.message().unwrap().contains("line 2"));
    assert_eq!(
        lookup(&mut stream, "ABC123").message().as_deref(),
        Some("alice")
    );
}

#[test]
fn test_oversized_push_is_invalid() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_push_bytes(16)
        .build();
    let store = MappingStore::open(config.clone()).unwrap();
    let server = start(store, config);
    let mut stream = TcpStream::connect(server.addr).unwrap();

    let response = push(&mut stream, "ABC123,alice\nXYZ789,bob\n");

    assert_eq!(response.status, Status::Invalid);
    assert!(response.message().unwrap().contains("exceeds limit"));
    assert_eq!(lookup(&mut stream, "ABC123").status, Status::NotFound);
}

#[test]
fn test_stats() {
    let server = start_push_only();
    let mut stream = TcpStream::connect(server.addr).unwrap();
    push(&mut stream, "a,1\nb,2\nc,3\n");

    let response = send(&mut stream, Command::Stats);
    assert_eq!(response.status, Status::Ok);

    let stats = decode_stats(&response.payload.unwrap()).unwrap();
    assert_eq!(stats.mode, SourceMode::PushOnly);
    assert_eq!(stats.entries, 3);
    assert_eq!(stats.reloads_applied, 1);
    assert!(stats.ready);
}

#[test]
fn test_clients_share_the_table() {
    let server = start_push_only();
    let mut writer = TcpStream::connect(server.addr).unwrap();
    let mut reader = TcpStream::connect(server.addr).unwrap();

    push(&mut writer, "ABC123,alice\n");

    assert_eq!(
        lookup(&mut reader, "ABC123").message().as_deref(),
        Some("alice")
    );
}

// =============================================================================
// Watched Server
// =============================================================================

#[test]
fn test_push_to_watched_server_is_invalid() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plates.csv");
    fs::write(&path, "ABC123,alice\n").unwrap();

    let config = Config::builder()
        .source_path(&path)
        .listen_addr("127.0.0.1:0")
        .build();
    let store = MappingStore::open(config.clone()).unwrap();
    let server = start(store, config);
    let mut stream = TcpStream::connect(server.addr).unwrap();

    let response = push(&mut stream, "ABC123,mallory\n");

    assert_eq!(response.status, Status::Invalid);
    assert_eq!(
        lookup(&mut stream, "ABC123").message().as_deref(),
        Some("alice")
    );
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_shutdown_stops_accept_loop() {
    let mut server = start_push_only();
    server.stop();

    assert!(server.handle.is_shutdown());
    assert!(server.thread.is_none());
}

#[test]
fn test_shutdown_stops_store_watcher() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plates.csv");
    fs::write(&path, "ABC123,alice\n").unwrap();

    let config = Config::builder()
        .source_path(&path)
        .listen_addr("127.0.0.1:0")
        .build();
    let store = Arc::new(MappingStore::open(config.clone()).unwrap());
    let mut server = start_shared(Arc::clone(&store), config);
    assert!(store.is_watching());

    server.stop();

    assert!(!store.is_watching());
    assert_eq!(store.lookup("ABC123"), Some("alice".to_string()));
}
