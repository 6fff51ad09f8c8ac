//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One worker thread per connection, bounded by `max_connections`
//! - Commands routed through `MappingStore`

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
