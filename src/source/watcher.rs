//! Source Watcher
//!
//! Background worker that feeds OS filesystem notifications to the
//! reload coordinator.
//!
//! The parent directory of the source is registered rather than the file
//! itself: renames, deletion and re-creation of the source are only
//! reported reliably at directory level. Events are handled one at a time,
//! in arrival order, on a dedicated thread. In-progress writes are held
//! back by a [`WriteGate`] until the file is complete.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::{self, Receiver, Sender};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::Result;
use crate::reload::{EventOutcome, ReloadCoordinator};

use super::settle::{WriteGate, WriteSignal};
use super::SourceEvent;

type NotifyResult = notify::Result<Event>;

/// Handle to the running watch worker
///
/// Dropping the handle stops the worker and releases the OS watch.
pub struct SourceWatcher {
    shutdown_tx: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl SourceWatcher {
    /// Register the directory containing `location` and start the worker
    pub fn spawn(coordinator: Arc<ReloadCoordinator>, location: &Path) -> Result<Self> {
        let (event_tx, event_rx) = channel::unbounded::<NotifyResult>();
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);

        // OS watcher → worker bridge
        let mut watcher = notify::recommended_watcher(move |res: NotifyResult| {
            // Receiver is gone only during shutdown
            let _ = event_tx.send(res);
        })?;

        let dir = watch_dir(location);
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(dir = %dir.display(), "Watching source directory");

        let worker = thread::Builder::new()
            .name("hotkv-watch".to_string())
            .spawn(move || run(watcher, dir, event_rx, shutdown_rx, coordinator))?;

        Ok(Self {
            shutdown_tx,
            worker: Some(worker),
        })
    }

    /// Stop the worker and wait for it to release the OS watch
    ///
    /// Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.shutdown_tx.try_send(());
            if worker.join().is_err() {
                tracing::error!("Watch worker panicked");
            }
            tracing::info!("Source watcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker loop: one event at a time until shutdown
fn run(
    mut watcher: RecommendedWatcher,
    mut dir: PathBuf,
    events: Receiver<NotifyResult>,
    shutdown: Receiver<()>,
    coordinator: Arc<ReloadCoordinator>,
) {
    let mut gate = WriteGate::new(WriteSignal::native());
    tracing::debug!(signal = ?gate.signal(), "Write completion signal");

    loop {
        let settled = match gate.deadline() {
            Some(deadline) => channel::at(deadline),
            None => channel::never(),
        };

        let ready = crossbeam::select! {
            recv(shutdown) -> _ => break,
            recv(events) -> msg => match msg {
                Ok(Ok(event)) => gate.admit(&event, Instant::now()),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "File watcher error");
                    continue;
                }
                Err(_) => break,
            },
            recv(settled) -> _ => gate.release(Instant::now()),
        };

        for source_event in ready {
            let outcome = coordinator.handle_event(&source_event);
            if let EventOutcome::Retargeted { to, .. } = &outcome {
                rewatch(&mut watcher, &mut dir, to);
            }
        }
    }

    // Releases the OS watch before the thread exits
    drop(watcher);
}

/// Move the registration when the source is renamed into another directory
///
/// Only reached when the backend reports both ends of a rename in one
/// event with the destination outside the watched directory. inotify
/// pairs rename ends only inside the watched directory, so on Linux a
/// move elsewhere arrives as `MovedAway` and holds instead.
fn rewatch<W: Watcher>(watcher: &mut W, dir: &mut PathBuf, location: &Path) {
    let target = watch_dir(location);
    if target == *dir {
        return;
    }

    // Register the new directory before giving up the old one
    if let Err(e) = watcher.watch(&target, RecursiveMode::NonRecursive) {
        tracing::error!(dir = %target.display(), error = %e, "Failed to watch new directory");
        return;
    }
    if let Err(e) = watcher.unwatch(dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "Failed to unwatch old directory");
    }
    tracing::info!(dir = %target.display(), "Watching source directory");
    *dir = target;
}

/// Directory registered with the OS for a source location
pub fn watch_dir(location: &Path) -> PathBuf {
    match location.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Normalise a notify event into source events
pub fn translate(event: &Event) -> Vec<SourceEvent> {
    let paths = &event.paths;

    match event.kind {
        EventKind::Create(_) => paths.iter().cloned().map(SourceEvent::Created).collect(),
        EventKind::Remove(_) => paths.iter().cloned().map(SourceEvent::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => translate_rename(mode, paths),
        EventKind::Modify(ModifyKind::Metadata(_)) => vec![SourceEvent::Other],
        EventKind::Modify(_) | EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
            paths.iter().cloned().map(SourceEvent::Modified).collect()
        }
        _ => vec![SourceEvent::Other],
    }
}

fn translate_rename(mode: RenameMode, paths: &[PathBuf]) -> Vec<SourceEvent> {
    match (mode, paths) {
        (RenameMode::Both, [from, to, ..]) => vec![SourceEvent::Renamed {
            from: from.clone(),
            to: to.clone(),
        }],
        (RenameMode::From, _) => paths.iter().cloned().map(SourceEvent::MovedAway).collect(),
        (RenameMode::To, _) => paths.iter().cloned().map(SourceEvent::MovedIn).collect(),
        // Backend could not tell which end this is; look at the disk
        _ => paths
            .iter()
            .map(|path| {
                if path.exists() {
                    SourceEvent::MovedIn(path.clone())
                } else {
                    SourceEvent::MovedAway(path.clone())
                }
            })
            .collect(),
    }
}
