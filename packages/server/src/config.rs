//! Server configuration.

use std::time::Duration;

/// Default bind address
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default listening port
pub const DEFAULT_PORT: u16 = 12345;
/// Default upper bound of one inbound line in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;
/// Default number of lines queued for one connection before it counts as unreachable
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;
/// Default time live connections get to tear down on shutdown
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Runtime settings of the relay server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to (e.g., "127.0.0.1")
    pub host: String,
    /// Port number to bind to (0 picks an ephemeral port)
    pub port: u16,
    /// Inbound lines longer than this are treated as a read fault
    pub max_line_length: usize,
    /// Unsent lines a connection may have queued before it is dropped
    pub outbound_queue_capacity: usize,
    /// How long shutdown waits for connection handlers before aborting them
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    /// `host:port` string passed to the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}
