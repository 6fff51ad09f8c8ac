//! TCP Server
//!
//! Accepts connections and dispatches each one to its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::{HotKvError, Result};
use crate::protocol::{write_response, Response};
use crate::store::MappingStore;

use super::Connection;

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Cloneable handle that stops a running server
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the accept loop to exit
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Shut down on SIGINT, SIGTERM or SIGHUP
    ///
    /// The handler is process-wide and can only be installed once.
    pub fn on_termination_signal(&self) -> Result<()> {
        let handle = self.clone();
        ctrlc::set_handler(move || {
            tracing::info!("Received termination signal, initiating shutdown...");
            handle.shutdown();
        })?;
        Ok(())
    }
}

/// TCP server for hotkv
pub struct Server {
    config: Config,
    store: Arc<MappingStore>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the listen address from config
    pub fn bind(config: Config, store: Arc<MappingStore>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            HotKvError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;

        // Non-blocking accept so the loop can notice shutdown
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            store,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Start the server (blocking until shutdown)
    ///
    /// Stops the store's watcher on the way out, so the OS watch is
    /// released before the caller tears anything else down.
    pub fn run(&mut self) -> Result<()> {
        let result = self.accept_loop();
        self.store.shutdown();
        result
    }

    fn accept_loop(&mut self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = self.dispatch(stream) {
                        tracing::warn!("Failed to serve {}: {}", addr, e);
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!("Server shutting down");
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn dispatch(&self, stream: TcpStream) -> Result<()> {
        // Accepted sockets inherit non-blocking mode on some platforms
        stream.set_nonblocking(false)?;

        if self.active.fetch_add(1, Ordering::AcqRel) >= self.config.max_connections {
            self.active.fetch_sub(1, Ordering::AcqRel);
            let mut stream = stream;
            let _ = write_response(&mut stream, &Response::error("Too many connections"));
            return Err(HotKvError::Network("connection limit reached".to_string()));
        }

        let mut connection =
            match Connection::new(stream, Arc::clone(&self.store), self.config.max_push_bytes) {
                Ok(connection) => connection,
                Err(e) => {
                    self.active.fetch_sub(1, Ordering::AcqRel);
                    return Err(e);
                }
            };

        let active = Arc::clone(&self.active);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let spawned = thread::Builder::new()
            .name("hotkv-conn".to_string())
            .spawn(move || {
                let result = connection
                    .set_timeouts(read_ms, write_ms)
                    .and_then(|_| connection.handle());
                if let Err(e) = result {
                    tracing::debug!("Connection {} closed with error: {}", connection.peer_addr(), e);
                }
                active.fetch_sub(1, Ordering::AcqRel);
            });

        if let Err(e) = spawned {
            self.active.fetch_sub(1, Ordering::AcqRel);
            return Err(e.into());
        }
        Ok(())
    }
}
