//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Lookup = 0x01,
    Push = 0x02,
    Ping = 0x03,
    Stats = 0x04,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Look up the value for a key
    Lookup { key: String },

    /// Replace the whole table with a two-column document
    Push { document: Vec<u8> },

    /// Ping (health check)
    Ping,

    /// Fetch store statistics
    Stats,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Lookup { .. } => CommandType::Lookup,
            Command::Push { .. } => CommandType::Push,
            Command::Ping => CommandType::Ping,
            Command::Stats => CommandType::Stats,
        }
    }
}
