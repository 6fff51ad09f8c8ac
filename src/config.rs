//! Configuration for hotkv
//!
//! Centralized configuration with sensible defaults. The store receives
//! its source location and mode through this struct, never through
//! process-wide state.

use std::path::PathBuf;

use crate::error::{HotKvError, Result};
use crate::source::SourceMode;

/// Main configuration for a hotkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Source Configuration
    // -------------------------------------------------------------------------
    /// Two-column mapping file to load and watch.
    /// `None` runs the store in push-only mode.
    pub source_path: Option<PathBuf>,

    /// Entries installed at construction in push-only mode
    pub seed_entries: Vec<(String, String)>,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    /// Largest document accepted by a PUSH command (in bytes)
    pub max_push_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_path: None,
            seed_entries: Vec::new(),
            listen_addr: "127.0.0.1:7420".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            max_push_bytes: 8 * 1024 * 1024, // 8 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Mode implied by the configured source
    pub fn mode(&self) -> SourceMode {
        match self.source_path {
            Some(_) => SourceMode::Watched,
            None => SourceMode::PushOnly,
        }
    }

    /// Reject combinations the store cannot honour
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.source_path {
            if path.as_os_str().is_empty() {
                return Err(HotKvError::Config("source path is empty".to_string()));
            }
            if !self.seed_entries.is_empty() {
                return Err(HotKvError::Config(
                    "seed entries are only allowed in push-only mode".to_string(),
                ));
            }
        }
        if self.max_connections == 0 {
            return Err(HotKvError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.max_push_bytes == 0 {
            return Err(HotKvError::Config(
                "max_push_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Watch and load the given mapping file
    pub fn source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_path = Some(path.into());
        self
    }

    /// Pre-seed a push-only store
    pub fn seed_entries<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config.seed_entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the push size limit (in bytes)
    pub fn max_push_bytes(mut self, bytes: usize) -> Self {
        self.config.max_push_bytes = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
