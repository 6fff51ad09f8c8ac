//! Error types for hotkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using HotKvError
pub type Result<T> = std::result::Result<T, HotKvError>;

/// Unified error type for hotkv operations
#[derive(Debug, Error)]
pub enum HotKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Decode Errors
    // -------------------------------------------------------------------------
    /// A record did not have exactly two well-formed fields
    #[error("Invalid record format at line {line}: {reason}")]
    InvalidFormat { line: usize, reason: String },

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    /// The mandatory first reload failed, so the store never became ready
    #[error("Store construction failed: {0}")]
    Construction(#[source] Box<HotKvError>),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Push updates are disabled while a source file is watched")]
    PushDisabled,

    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HotKvError {
    pub(crate) fn invalid_format(line: usize, reason: impl Into<String>) -> Self {
        HotKvError::InvalidFormat {
            line,
            reason: reason.into(),
        }
    }

    /// True for a rejected record shape
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, HotKvError::InvalidFormat { .. })
    }

    /// True when the caller, not the server, is at fault
    ///
    /// The network layer maps these to an `INVALID` response and
    /// everything else to `ERROR`.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HotKvError::InvalidFormat { .. } | HotKvError::PushDisabled | HotKvError::Protocol(_)
        )
    }
}
