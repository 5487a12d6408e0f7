//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DARSHAN_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//! - `DARSHAN_BASE_URL` - Public URL the site is served from; media object
//!   URLs are derived from it
//!
//! ## Optional
//! - `DARSHAN_HOST` - Bind address (default: 127.0.0.1)
//! - `DARSHAN_PORT` - Listen port (default: 3000)
//! - `DARSHAN_MEDIA_ROOT` - Directory holding uploaded objects
//!   (default: media)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Daily Darshan application configuration.
#[derive(Debug, Clone)]
pub struct DarshanConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site (no trailing slash)
    pub base_url: String,
    /// Directory where uploaded media objects are stored
    pub media_root: PathBuf,
}

impl DarshanConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("DARSHAN_DATABASE_URL")?;
        let host = get_env_or_default("DARSHAN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("DARSHAN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("DARSHAN_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("DARSHAN_PORT".to_string(), e.to_string()))?;
        let base_url = normalize_base_url(&get_required_env("DARSHAN_BASE_URL")?)?;
        let media_root = PathBuf::from(get_env_or_default("DARSHAN_MEDIA_ROOT", "media"));

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            media_root,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by hosted postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate the base URL and strip any trailing slash.
fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("DARSHAN_BASE_URL".to_string(), e.to_string()))?;
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "DARSHAN_BASE_URL".to_string(),
            "must have a host".to_string(),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_strips_trailing_slash() {
        let url = normalize_base_url("http://localhost:3000/").unwrap();
        assert_eq!(url, "http://localhost:3000");
    }

    #[test]
    fn test_normalize_base_url_keeps_plain_url() {
        let url = normalize_base_url("https://darshan.example.com").unwrap();
        assert_eq!(url, "https://darshan.example.com");
    }

    #[test]
    fn test_normalize_base_url_rejects_garbage() {
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = DarshanConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            media_root: PathBuf::from("media"),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }
}
