//! Watcher Tests
//!
//! End-to-end tests against the real OS notification backend. Each test
//! polls with a generous deadline because delivery latency varies across
//! platforms and CI machines.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hotkv::MappingStore;
use tempfile::TempDir;

const DEADLINE: Duration = Duration::from_secs(10);
const SETTLE: Duration = Duration::from_millis(500);

/// Poll `check` until it holds or the deadline passes
fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    check()
}

#[test]
fn test_rewrite_is_picked_up() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plates.csv");
    fs::write(&path, "ABC123,alice\n").unwrap();

    let store = MappingStore::open_path(&path).unwrap();
    assert_eq!(store.lookup("ABC123"), Some("alice".to_string()));
    assert_eq!(store.lookup("ZZZ000"), None);

    fs::write(&path, "ABC123,carol\n").unwrap();

    assert!(
        wait_for(|| store.lookup("ABC123").as_deref() == Some("carol")),
        "rewrite was not reloaded"
    );
    store.shutdown();
}

#[test]
fn test_removal_keeps_serving() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plates.csv");
    fs::write(&path, "ABC123,alice\nXYZ789,bob\n").unwrap();

    let store = MappingStore::open_path(&path).unwrap();
    fs::remove_file(&path).unwrap();
    thread::sleep(SETTLE);

    assert_eq!(store.lookup("ABC123"), Some("alice".to_string()));
    assert_eq!(store.lookup("XYZ789"), Some("bob".to_string()));
    assert!(store.is_watching());

    // Source comes back
    fs::write(&path, "ABC123,dave\n").unwrap();
    assert!(
        wait_for(|| store.lookup("ABC123").as_deref() == Some("dave")),
        "recreated source was not reloaded"
    );
}

#[cfg(target_os = "linux")]
#[test]
fn test_rename_follows_new_name() {
    let temp = TempDir::new().unwrap();
    let old = temp.path().join("plates.csv");
    let new = temp.path().join("plates-renamed.csv");
    fs::write(&old, "ABC123,alice\n").unwrap();

    let store = MappingStore::open_path(&old).unwrap();
    fs::rename(&old, &new).unwrap();

    let expected = fs::canonicalize(&new).unwrap();
    assert!(
        wait_for(|| store.location().as_deref() == Some(expected.as_path())),
        "location did not follow the rename"
    );
    assert_eq!(store.lookup("ABC123"), Some("alice".to_string()));

    fs::write(&new, "ABC123,erin\n").unwrap();
    assert!(
        wait_for(|| store.lookup("ABC123").as_deref() == Some("erin")),
        "write to renamed source was not reloaded"
    );
}

#[cfg(target_os = "linux")]
#[test]
fn test_chunked_rewrite_never_serves_partial_table() {
    const ENTRIES: usize = 50_000;
    const CHUNK: usize = 5_000;

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plates.csv");
    let document: String = (0..ENTRIES).map(|i| format!("k{:06},old\n", i)).collect();
    fs::write(&path, document).unwrap();

    let store = Arc::new(MappingStore::open_path(&path).unwrap());
    let last_key = format!("k{:06}", ENTRIES - 1);

    let done = Arc::new(AtomicBool::new(false));
    let smallest = Arc::new(AtomicUsize::new(usize::MAX));
    let reader = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        let smallest = Arc::clone(&smallest);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                smallest.fetch_min(store.snapshot().len(), Ordering::Relaxed);
            }
        })
    };

    // Rewrite in place, flushing each chunk while the file stays open
    {
        let mut writer = BufWriter::new(File::create(&path).unwrap());
        for start in (0..ENTRIES).step_by(CHUNK) {
            for i in start..start + CHUNK {
                writeln!(writer, "k{:06},new", i).unwrap();
            }
            writer.flush().unwrap();
            thread::sleep(Duration::from_millis(20));
        }
    }

    assert!(
        wait_for(|| store.lookup(&last_key).as_deref() == Some("new")),
        "completed rewrite was not reloaded"
    );
    done.store(true, Ordering::Release);
    reader.join().unwrap();

    assert_eq!(smallest.load(Ordering::Relaxed), ENTRIES);
    assert_eq!(store.len(), ENTRIES);
    assert_eq!(store.stats().reloads_failed, 0);
}

#[test]
fn test_shutdown_stops_reloads() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plates.csv");
    fs::write(&path, "ABC123,alice\n").unwrap();

    let store = MappingStore::open_path(&path).unwrap();
    store.shutdown();
    assert!(!store.is_watching());

    fs::write(&path, "ABC123,carol\n").unwrap();
    thread::sleep(SETTLE);

    assert_eq!(store.lookup("ABC123"), Some("alice".to_string()));
}
