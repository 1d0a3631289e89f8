//! Application configuration.

use std::env;

use crate::server::{env_or, ServerConfig};

/// Bootstrap toggles and the server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Decode JSON and URL-encoded bodies before handlers run.
    pub body_parser: bool,
    /// Omit stack details from error responses.
    pub production: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            body_parser: true,
            production: false,
        }
    }
}

impl AppConfig {
    /// Reads `APP_ENV` (`production` turns on production mode),
    /// `APP_BODY_PARSER` and the server's `MICROHTTP_*` variables.
    pub fn from_env() -> Self {
        let production = env::var("APP_ENV")
            .map(|value| value.trim().eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        Self {
            server: ServerConfig::from_env(),
            body_parser: env_or("APP_BODY_PARSER", true),
            production,
        }
    }
}
