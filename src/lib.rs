//! # hotkv
//!
//! A hot-reloadable key-value lookup store with:
//! - Lock-light point lookups that never observe a half-applied reload
//! - Whole-table reloads from a watched two-column file
//! - Rename/remove handling that never drops last-known-good data
//! - Explicit pushes as an alternative source, behind the same reload path
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────────┐
//! │   TCP Server         │        │   Source Watcher (thread)    │
//! │ LOOKUP / PUSH / ...  │        │ notify → SourceEvent         │
//! └───────┬───────┬──────┘        └──────────────┬───────────────┘
//!         │       │ push                         │ event
//!         │       ▼                              ▼
//!         │  ┌─────────────────────────────────────────────┐
//!         │  │            Reload Coordinator               │
//!         │  │  (one mutex: SourceTracker + replacement)   │
//!         │  └──────────────────────┬──────────────────────┘
//!         │                         │ decode → replace
//!  lookup │                         ▼
//!         │               ┌───────────────────┐
//!         └─────────────▶ │   MappingTable    │
//!                         │  (RwLock<Arc<..>>)│
//!                         └───────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod table;
pub mod decoder;
pub mod source;
pub mod reload;
pub mod store;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HotKvError, Result};
pub use config::Config;
pub use store::{MappingStore, StoreStats};
pub use source::SourceMode;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of hotkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
