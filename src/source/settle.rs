//! Write settling
//!
//! A writer rewriting the source in place produces one data event per
//! write call. Reloading on each of them would install a truncated table,
//! so data and create events are held back until the write is complete:
//! - inotify reports the writer closing the file, which is the only
//!   signal acted on there
//! - other backends have no close notification, so held events are
//!   released once the directory has been quiet for a settle window

use std::path::PathBuf;
use std::time::{Duration, Instant};

use notify::event::ModifyKind;
use notify::{Event, EventKind};

use super::watcher::translate;
use super::SourceEvent;

/// Quiet period before a write is treated as complete where the backend
/// has no close-write notification
pub const WRITE_SETTLE: Duration = Duration::from_millis(250);

/// When a written file is considered complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSignal {
    /// The backend reports the writer closing the file
    CloseWrite,

    /// No close notification; wait for writes to go quiet
    Settle(Duration),
}

impl WriteSignal {
    /// Signal available from the platform's recommended watcher
    pub fn native() -> Self {
        if cfg!(any(target_os = "linux", target_os = "android")) {
            WriteSignal::CloseWrite
        } else {
            WriteSignal::Settle(WRITE_SETTLE)
        }
    }
}

/// Holds back in-progress writes until they are complete
#[derive(Debug)]
pub struct WriteGate {
    signal: WriteSignal,

    /// Held events in arrival order, at most one per path
    pending: Vec<(PathBuf, SourceEvent)>,

    deadline: Option<Instant>,
}

impl WriteGate {
    pub fn new(signal: WriteSignal) -> Self {
        Self {
            signal,
            pending: Vec::new(),
            deadline: None,
        }
    }

    /// Source events from `event` that can be applied now
    pub fn admit(&mut self, event: &Event, now: Instant) -> Vec<SourceEvent> {
        let translated = translate(event);

        if !is_partial_write(&event.kind) {
            // Removal, rename or close supersedes whatever was held
            self.pending.retain(|(path, _)| !event.paths.contains(path));
            if self.pending.is_empty() {
                self.deadline = None;
            }
            return translated;
        }

        let quiet = match self.signal {
            WriteSignal::CloseWrite => return Vec::new(),
            WriteSignal::Settle(quiet) => quiet,
        };

        for held in translated {
            let path = match &held {
                SourceEvent::Created(path) | SourceEvent::Modified(path) => path.clone(),
                _ => continue,
            };
            self.pending.retain(|(p, _)| *p != path);
            self.pending.push((path, held));
        }
        if !self.pending.is_empty() {
            self.deadline = Some(now + quiet);
        }
        Vec::new()
    }

    /// Held events whose settle window has passed
    pub fn release(&mut self, now: Instant) -> Vec<SourceEvent> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.drain(..).map(|(_, event)| event).collect()
            }
            _ => Vec::new(),
        }
    }

    /// When the held events become due, if any are held
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn signal(&self) -> WriteSignal {
        self.signal
    }
}

/// Data written or file created, with more writes possibly to follow
fn is_partial_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other)
    )
}
