//! Source Tracker
//!
//! Holds the current source location and classifies lifecycle events.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HotKvError, Result};

use super::{Directive, SourceEvent, SourceMode};

/// Current location of the mapping source
///
/// In watched mode the location is always set; it is replaced on rename
/// and never cleared. In push-only mode there is no location.
#[derive(Debug, Clone)]
pub struct SourceTracker {
    location: Option<PathBuf>,
}

impl SourceTracker {
    /// Track a file on disk
    pub fn watched(location: PathBuf) -> Self {
        Self {
            location: Some(location),
        }
    }

    /// Track nothing; reloads come from pushes
    pub fn push_only() -> Self {
        Self { location: None }
    }

    pub fn mode(&self) -> SourceMode {
        match self.location {
            Some(_) => SourceMode::Watched,
            None => SourceMode::PushOnly,
        }
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Decide how to react to `event`
    pub fn classify(&self, event: &SourceEvent) -> Directive {
        let Some(location) = self.location.as_deref() else {
            return Directive::Ignore;
        };

        match event {
            SourceEvent::Modified(path) | SourceEvent::Created(path) | SourceEvent::MovedIn(path)
                if path == location =>
            {
                Directive::Reload
            }
            SourceEvent::Removed(path) | SourceEvent::MovedAway(path) if path == location => {
                Directive::Hold
            }
            SourceEvent::Renamed { from, to } if from == location => {
                if to == location {
                    Directive::Reload
                } else {
                    Directive::Retarget(to.clone())
                }
            }
            // Atomic save: a temp file renamed over the source
            SourceEvent::Renamed { to, .. } if to == location => Directive::Reload,
            _ => Directive::Ignore,
        }
    }

    /// Replace the tracked location, returning the previous one
    ///
    /// Ignored in push-only mode, where there is nothing to retarget.
    pub fn retarget(&mut self, to: PathBuf) -> Option<PathBuf> {
        match self.location.as_mut() {
            Some(current) => Some(std::mem::replace(current, to)),
            None => None,
        }
    }
}

/// Absolute form of a configured source path
///
/// The parent directory is canonicalized so the location compares equal
/// to the paths the OS watcher reports. The file itself may not exist yet.
pub fn resolve_location(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| HotKvError::Config(format!("{} does not name a file", path.display())))?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    Ok(fs::canonicalize(parent)?.join(file_name))
}
