//! Server Configuration
//!
//! Everything tunable about a [`Server`](crate::server::Server) lives here.
//! The command table is passed separately through
//! [`Server::with_command_table`](crate::server::Server::with_command_table).

use crate::connection::ConnectionSettings;
use crate::server::ServerError;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on (0 picks an ephemeral port)
    pub port: u16,

    /// Bounded capacity of each class queue
    pub queue_capacity: usize,

    /// Requests one connection may have in flight before its reader waits
    pub reply_queue_depth: usize,

    /// Largest unparsed input one connection may buffer
    pub max_buffer_size: usize,

    /// TCP nodelay
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            queue_capacity: 50,
            reply_queue_depth: 1024,
            max_buffer_size: 64 * 1024 * 1024, // 64MB
            tcp_nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The per-connection part of the configuration.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            max_buffer_size: self.max_buffer_size,
            reply_queue_depth: self.reply_queue_depth,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.queue_capacity == 0 {
            return Err(ServerError::InvalidConfig(
                "queue_capacity must be > 0".to_string(),
            ));
        }

        if self.reply_queue_depth == 0 {
            return Err(ServerError::InvalidConfig(
                "reply_queue_depth must be > 0".to_string(),
            ));
        }

        if self.max_buffer_size == 0 {
            return Err(ServerError::InvalidConfig(
                "max_buffer_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
