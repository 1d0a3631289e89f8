//! Server configuration.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use log::warn;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The size of each socket read.
    pub read_buffer_size: usize,
    /// Largest accepted request body in bytes; larger requests get 413.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1024,
            read_buffer_size: 8192,
            max_body_size: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Builds a configuration from `MICROHTTP_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparsable ones are logged and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            addr: env_or("MICROHTTP_ADDR", defaults.addr),
            max_connections: env_or("MICROHTTP_MAX_CONNECTIONS", defaults.max_connections),
            read_buffer_size: env_or("MICROHTTP_READ_BUFFER_SIZE", defaults.read_buffer_size),
            max_body_size: env_or("MICROHTTP_MAX_BODY_SIZE", defaults.max_body_size),
        }
    }
}

pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value for {key}: {raw:?}");
            default
        }),
        Err(_) => default,
    }
}
