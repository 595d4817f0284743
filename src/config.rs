//! Layered configuration.
//!
//! Values are resolved in this order, later sources winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (`--config docstore.toml`)
//! 3. Environment variables: `DOCSTORE__SECTION__KEY`, e.g.
//!    `DOCSTORE__SERVER__HTTP_PORT=9000`
//!
//! ```toml
//! [server]
//! http_addr = "127.0.0.1"
//! http_port = 8089
//!
//! [store]
//! default_query_limit = 10
//! max_query_limit = 1000
//! max_payload_bytes = 1048576
//!
//! [logging]
//! level = "info"
//! ansi = true
//! ```

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DOCSTORE";

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: String,
    /// HTTP port
    pub http_port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1".to_string(),
            http_port: 8089,
            enable_cors: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
            timeout_secs: 30,
        }
    }
}

/// Document store limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Limit used when a query does not name one
    pub default_query_limit: usize,
    /// Upper bound for query limits; larger requests are clamped
    pub max_query_limit: usize,
    /// Largest accepted payload, measured as serialized JSON
    pub max_payload_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_query_limit: 10,
            max_query_limit: 1000,
            max_payload_bytes: 1024 * 1024, // 1MB
        }
    }
}

impl StoreConfig {
    /// Checks that the limits are usable.
    pub fn validate(&self) -> Result<()> {
        if self.default_query_limit == 0 {
            return Err(Error::Config(
                "store.default_query_limit must be positive".to_string(),
            ));
        }
        if self.max_query_limit < self.default_query_limit {
            return Err(Error::Config(format!(
                "store.max_query_limit ({}) is below store.default_query_limit ({})",
                self.max_query_limit, self.default_query_limit
            )));
        }
        if self.max_payload_bytes == 0 {
            return Err(Error::Config(
                "store.max_payload_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for daily rolling log files; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Colored console output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            ansi: true,
        }
    }
}

impl AppConfig {
    /// Loads configuration from defaults, an optional TOML file and the
    /// `DOCSTORE__*` environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        Self::finish(builder)
    }

    /// Parses configuration from TOML text on top of the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))?;
        config.store.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.store.default_query_limit, 10);
        assert_eq!(config.server.http_port, 8089);
    }

    #[test]
    fn test_partial_file_overrides() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            http_port = 9100

            [store]
            default_query_limit = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.server.http_port, 9100);
        assert_eq!(config.server.http_addr, "127.0.0.1");
        assert_eq!(config.store.default_query_limit, 25);
        assert_eq!(config.store.max_query_limit, 1000);
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let err = AppConfig::from_toml_str("[store]\ndefault_query_limit = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = AppConfig::from_toml_str(
            "[store]\ndefault_query_limit = 50\nmax_query_limit = 20\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AppConfig::default();
        config.logging.log_dir = Some(PathBuf::from("logs"));
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[store]"));
        assert_eq!(AppConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
