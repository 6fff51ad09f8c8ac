//! Signal Tests
//!
//! Runs in its own test binary: the termination handler is process-wide
//! and can only be installed once.

#![cfg(unix)]

use std::fs;
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hotkv::config::Config;
use hotkv::network::Server;
use hotkv::MappingStore;
use tempfile::TempDir;

#[test]
fn test_interrupt_stops_server_and_watcher() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plates.csv");
    fs::write(&path, "ABC123,alice\n").unwrap();

    let config = Config::builder()
        .source_path(&path)
        .listen_addr("127.0.0.1:0")
        .build();
    let store = Arc::new(MappingStore::open(config.clone()).unwrap());
    let mut server = Server::bind(config, Arc::clone(&store)).unwrap();
    let handle = server.shutdown_handle();
    handle.on_termination_signal().unwrap();

    let worker = thread::spawn(move || server.run());

    let status = Command::new("kill")
        .args(["-s", "INT", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let start = Instant::now();
    while !handle.is_shutdown() && start.elapsed() < Duration::from_secs(10) {
        thread::sleep(Duration::from_millis(25));
    }
    assert!(handle.is_shutdown(), "signal did not reach the server");

    worker.join().unwrap().unwrap();
    assert!(!store.is_watching());
    assert_eq!(store.lookup("ABC123"), Some("alice".to_string()));
}
