//! Source Module
//!
//! Tracks where the mapping document lives and turns filesystem lifecycle
//! notifications into reload directives.
//!
//! ## Flow
//! ```text
//!   OS notification ──▶ SourceEvent ──▶ SourceTracker::classify ──▶ Directive
//!     (notify)          (normalised)        (location aware)
//! ```
//!
//! Data and create notifications only count once the write is complete:
//! on close-write where the backend reports it, otherwise after a quiet
//! period (see [`WriteSignal`]).
//!
//! | Event on tracked path            | Directive          |
//! |----------------------------------|--------------------|
//! | modified / created / moved in    | `Reload`           |
//! | renamed away to a known name     | `Retarget(to)`     |
//! | removed / moved away (unknown)   | `Hold`             |
//! | anything on another path         | `Ignore`           |

mod settle;
mod tracker;
mod watcher;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use settle::{WriteGate, WriteSignal, WRITE_SETTLE};
pub use tracker::{resolve_location, SourceTracker};
pub use watcher::{translate, watch_dir, SourceWatcher};

/// Where reloads come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceMode {
    /// A file on disk is loaded and watched
    Watched,

    /// Reloads only arrive as explicit pushes
    PushOnly,
}

/// A filesystem lifecycle notification, normalised across platforms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// Content written in place, writer finished
    Modified(PathBuf),

    /// A file appeared at the path
    Created(PathBuf),

    /// The path was unlinked
    Removed(PathBuf),

    /// Rename with both ends known
    Renamed { from: PathBuf, to: PathBuf },

    /// The path was renamed to somewhere we cannot see
    MovedAway(PathBuf),

    /// Something was renamed onto the path
    MovedIn(PathBuf),

    /// Access, metadata and other notifications
    Other,
}

/// What the reload coordinator should do about an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Re-read the tracked location
    Reload,

    /// Point the tracker at a new location, then re-read it
    Retarget(PathBuf),

    /// Keep serving the last-known-good table
    Hold,

    /// Not about the tracked source
    Ignore,
}
