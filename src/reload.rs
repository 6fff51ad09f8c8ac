//! Reload Coordinator
//!
//! Single serialization point for every reload, whatever triggered it.
//!
//! ## Responsibilities
//! - Re-read the tracked file, or decode a pushed document
//! - Swap the mapping table only after a document decodes cleanly
//! - Apply rename retargets inside the same critical section as reloads
//! - Keep the last-known-good table when a reload fails
//!
//! ## Concurrency
//! `tracker` is a mutex that is held for the whole of a reload: open,
//! decode and swap. Two triggers never overlap and are applied in the
//! order they take the lock. Lookups go straight to the table's RwLock and
//! never touch this mutex.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::decoder;
use crate::error::{HotKvError, Result};
use crate::source::{Directive, SourceEvent, SourceTracker};
use crate::table::MappingTable;

/// Result of a successful trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A new table was installed
    Applied { entries: usize },

    /// Nothing to read: push-only store asked to reload its (absent) file
    Skipped,
}

/// What handling one filesystem event amounted to
#[derive(Debug)]
pub enum EventOutcome {
    /// The tracked file was re-read and installed
    Reloaded { entries: usize },

    /// The tracker moved to a new location, then re-read it
    Retargeted {
        from: PathBuf,
        to: PathBuf,
        reload: Result<usize>,
    },

    /// The source is unavailable; the last-known-good table stays
    Held,

    /// The event concerned some other path
    Ignored,

    /// The re-read failed; the last-known-good table stays
    Failed(HotKvError),
}

/// Coordinates reloads of one mapping table
pub struct ReloadCoordinator {
    /// Table served to lookups
    table: MappingTable,

    /// Source location; the lock also serializes table replacement
    tracker: Mutex<SourceTracker>,

    /// Set by the first successful reload
    ready: AtomicBool,

    reloads_applied: AtomicU64,
    reloads_failed: AtomicU64,
}

impl ReloadCoordinator {
    pub fn new(tracker: SourceTracker) -> Self {
        Self {
            table: MappingTable::new(),
            tracker: Mutex::new(tracker),
            ready: AtomicBool::new(false),
            reloads_applied: AtomicU64::new(0),
            reloads_failed: AtomicU64::new(0),
        }
    }

    /// Reload from `stream` if given, else from the tracked location
    ///
    /// Errors are returned to the caller and the table is left as it was.
    pub fn trigger_reload(&self, stream: Option<&mut dyn Read>) -> Result<ReloadOutcome> {
        let tracker = self.tracker.lock();

        let result = match stream {
            Some(stream) => self.apply_stream(stream),
            None => match tracker.location() {
                Some(location) => self.apply_file(location),
                None => return Ok(ReloadOutcome::Skipped),
            },
        };

        result.map(|entries| ReloadOutcome::Applied { entries })
    }

    /// React to one filesystem lifecycle event
    ///
    /// Failures are logged and reported in the outcome; they never clear
    /// the table.
    pub fn handle_event(&self, event: &SourceEvent) -> EventOutcome {
        let mut tracker = self.tracker.lock();
        let directive = tracker.classify(event);
        tracing::debug!(?event, ?directive, "Source event");

        match directive {
            Directive::Ignore => EventOutcome::Ignored,
            Directive::Hold => {
                tracing::warn!(
                    location = ?tracker.location(),
                    entries = self.table.len(),
                    "Source removed or moved away, continuing to use old data"
                );
                EventOutcome::Held
            }
            Directive::Reload => match tracker.location() {
                Some(location) => match self.apply_file(location) {
                    Ok(entries) => EventOutcome::Reloaded { entries },
                    Err(e) => EventOutcome::Failed(e),
                },
                None => EventOutcome::Ignored,
            },
            Directive::Retarget(to) => {
                let from = match tracker.retarget(to.clone()) {
                    Some(from) => from,
                    None => return EventOutcome::Ignored,
                };
                tracing::info!(from = %from.display(), to = %to.display(), "Source renamed");

                // Location is already updated, so this reads the new name
                let reload = self.apply_file(&to);
                EventOutcome::Retargeted { from, to, reload }
            }
        }
    }

    /// Install entries directly, bypassing the decoder (push-only seeding)
    pub fn seed<I>(&self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let _tracker = self.tracker.lock();
        let entries = self.table.replace(pairs);
        self.mark_applied(entries, "seed");
        entries
    }

    // =========================================================================
    // Internal (called with the tracker lock held)
    // =========================================================================

    fn apply_file(&self, location: &Path) -> Result<usize> {
        let result = File::open(location)
            .map_err(HotKvError::from)
            .and_then(decoder::decode);

        match result {
            Ok(pairs) => {
                let entries = self.table.replace(pairs);
                self.mark_applied(entries, &location.display().to_string());
                Ok(entries)
            }
            Err(e) => {
                self.reloads_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    location = %location.display(),
                    error = %e,
                    "Reload failed, keeping last-known-good table"
                );
                Err(e)
            }
        }
    }

    fn apply_stream(&self, stream: &mut dyn Read) -> Result<usize> {
        match decoder::decode(&mut *stream) {
            Ok(pairs) => {
                let entries = self.table.replace(pairs);
                self.mark_applied(entries, "push");
                Ok(entries)
            }
            Err(e) => {
                if e.is_invalid_format() {
                    // Discard whatever the pusher is still sending
                    let _ = io::copy(stream, &mut io::sink());
                }
                self.reloads_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Pushed update rejected");
                Err(e)
            }
        }
    }

    fn mark_applied(&self, entries: usize, origin: &str) {
        self.reloads_applied.fetch_add(1, Ordering::Relaxed);
        if !self.ready.swap(true, Ordering::AcqRel) {
            tracing::info!(origin, entries, "Store ready");
        }
        tracing::info!(origin, entries, "Store updated");
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Current tracked location (takes the tracker lock)
    pub fn location(&self) -> Option<PathBuf> {
        self.tracker.lock().location().map(Path::to_path_buf)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn reloads_applied(&self) -> u64 {
        self.reloads_applied.load(Ordering::Relaxed)
    }

    pub fn reloads_failed(&self) -> u64 {
        self.reloads_failed.load(Ordering::Relaxed)
    }
}
