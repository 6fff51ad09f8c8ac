//! Store Module
//!
//! The public face of hotkv: construction, lookups, pushes and shutdown.
//!
//! ## Responsibilities
//! - Perform the mandatory first load in watched mode
//! - Start and stop the background source watcher
//! - Gate pushes to push-only mode
//! - Report statistics

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{HotKvError, Result};
use crate::reload::{EventOutcome, ReloadCoordinator, ReloadOutcome};
use crate::source::{resolve_location, SourceEvent, SourceMode, SourceTracker, SourceWatcher};
use crate::table::Snapshot;

/// Point-in-time statistics for a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub mode: SourceMode,
    pub location: Option<PathBuf>,
    pub entries: u64,
    pub reloads_applied: u64,
    pub reloads_failed: u64,
    pub ready: bool,
}

/// A hot-reloadable key/value lookup store
///
/// ## Concurrency Model
///
/// - **Lookups**: run on the caller's thread against the table's RwLock;
///   many proceed at once and never wait on a decode in progress
/// - **Reloads**: file events (watch thread) and pushes (caller thread)
///   all go through one `ReloadCoordinator` mutex, one at a time
pub struct MappingStore {
    mode: SourceMode,

    coordinator: Arc<ReloadCoordinator>,

    /// Present only in watched mode until shutdown
    watcher: Mutex<Option<SourceWatcher>>,
}

impl MappingStore {
    /// Build a store from config
    ///
    /// In watched mode the source is loaded before this returns and any
    /// failure is reported as `HotKvError::Construction`. In push-only mode
    /// the store starts empty, or with the configured seed entries.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        match config.source_path {
            Some(path) => Self::open_watched(&path),
            None => Ok(Self::open_push_only(config.seed_entries)),
        }
    }

    /// Open a watched store on `path` with default config
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(Config::builder().source_path(path).build())
    }

    fn open_watched(path: &std::path::Path) -> Result<Self> {
        let location =
            resolve_location(path).map_err(|e| HotKvError::Construction(Box::new(e)))?;
        let coordinator = Arc::new(ReloadCoordinator::new(SourceTracker::watched(
            location.clone(),
        )));

        // Watch first so a write racing the initial load is not missed
        let watcher = SourceWatcher::spawn(Arc::clone(&coordinator), &location)
            .map_err(|e| HotKvError::Construction(Box::new(e)))?;

        // A failed first load drops the watcher, which stops it
        coordinator
            .trigger_reload(None)
            .map_err(|e| HotKvError::Construction(Box::new(e)))?;

        Ok(Self {
            mode: SourceMode::Watched,
            coordinator,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    fn open_push_only(seed: Vec<(String, String)>) -> Self {
        let coordinator = Arc::new(ReloadCoordinator::new(SourceTracker::push_only()));

        if seed.is_empty() {
            tracing::info!("No mapping file provided, using explicit updates");
        } else {
            coordinator.seed(seed);
        }

        Self {
            mode: SourceMode::PushOnly,
            coordinator,
            watcher: Mutex::new(None),
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Get the value for a key
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.coordinator.table().lookup(key)
    }

    /// Immutable view of the whole table for consistent multi-key reads
    pub fn snapshot(&self) -> Snapshot {
        self.coordinator.table().snapshot()
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Replace the whole table with the document read from `stream`
    ///
    /// Only allowed in push-only mode. On `InvalidFormat` or `Io` the
    /// table is left untouched. Returns the number of entries installed.
    pub fn push_update(&self, stream: &mut dyn Read) -> Result<usize> {
        if self.mode != SourceMode::PushOnly {
            return Err(HotKvError::PushDisabled);
        }

        match self.coordinator.trigger_reload(Some(stream))? {
            ReloadOutcome::Applied { entries } => Ok(entries),
            ReloadOutcome::Skipped => Ok(0),
        }
    }

    /// Re-read the tracked source now
    pub fn reload(&self) -> Result<ReloadOutcome> {
        self.coordinator.trigger_reload(None)
    }

    /// Feed one lifecycle notification through the same path the watcher uses
    pub fn handle_event(&self, event: &SourceEvent) -> EventOutcome {
        self.coordinator.handle_event(event)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop watching and release the OS watch handle
    ///
    /// Lookups keep working afterwards. Calling this again is a no-op.
    pub fn shutdown(&self) {
        let watcher = self.watcher.lock().take();
        if let Some(mut watcher) = watcher {
            watcher.stop();
        }
    }

    /// Whether the background watcher is still running
    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .as_ref()
            .map_or(false, SourceWatcher::is_running)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    /// Current tracked location (follows renames)
    pub fn location(&self) -> Option<PathBuf> {
        self.coordinator.location()
    }

    /// True once any load, push or seed has been applied
    pub fn is_ready(&self) -> bool {
        self.coordinator.is_ready()
    }

    pub fn len(&self) -> usize {
        self.coordinator.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinator.table().is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            mode: self.mode,
            location: self.location(),
            entries: self.len() as u64,
            reloads_applied: self.coordinator.reloads_applied(),
            reloads_failed: self.coordinator.reloads_failed(),
            ready: self.is_ready(),
        }
    }
}

impl Drop for MappingStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}
