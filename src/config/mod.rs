// Configuration module entry point
// Loads configuration from file + environment and holds shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{Config, HttpConfig, StorageBackend, StorageConfig};

use crate::logger::{Level, LogFormat};

type DefaultBuilder = config::ConfigBuilder<config::builder::DefaultState>;

impl Config {
    /// Load configuration from specified file path (extension optional)
    /// Environment variables `POSTBOARD_<SECTION>__<KEY>` override file values
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = Self::with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("POSTBOARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate().map_err(config::ConfigError::Message)?;
        Ok(cfg)
    }

    /// Built-in defaults only, without file or environment sources
    #[cfg(test)]
    pub fn defaults() -> Result<Self, config::ConfigError> {
        Self::with_defaults(config::Config::builder())?
            .build()?
            .try_deserialize()
    }

    fn with_defaults(builder: DefaultBuilder) -> Result<DefaultBuilder, config::ConfigError> {
        builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "postboard/0.1")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("api.base_path", "/api")?
            .set_default("api.strict_status_codes", false)?
            .set_default("health.enabled", true)?
            .set_default("health.liveness_path", "/healthz")?
            .set_default("health.readiness_path", "/readyz")?
            .set_default("storage.backend", "sqlite")?
            .set_default("storage.path", "data/posts.db3")
    }

    /// Reject values that deserialize fine but cannot be served
    pub fn validate(&self) -> Result<(), String> {
        self.get_socket_addr()?;

        let base = &self.api.base_path;
        if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
            return Err(format!(
                "api.base_path must be empty or start with '/' and not end with '/': '{base}'"
            ));
        }

        if self.storage.backend == StorageBackend::Sqlite && self.storage.path.trim().is_empty() {
            return Err("storage.path must not be empty for the sqlite backend".to_string());
        }

        if self.health.enabled {
            for path in [&self.health.liveness_path, &self.health.readiness_path] {
                if !path.starts_with('/') {
                    return Err(format!("health path must start with '/': '{path}'"));
                }
            }
        }

        self.logging.level.parse::<Level>()?;
        if self.logging.access_log_format.trim().is_empty() {
            return Err("logging.access_log_format must not be empty".to_string());
        }

        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    pub fn access_log_format(&self) -> LogFormat {
        LogFormat::parse(&self.logging.access_log_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::defaults().unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.server.workers, None);
        assert_eq!(cfg.api.base_path, "/api");
        assert!(!cfg.api.strict_status_codes);
        assert_eq!(cfg.storage.backend, StorageBackend::Sqlite);
        assert_eq!(cfg.performance.max_connections, None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postboard.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100
workers = 2

[api]
base_path = ""
strict_status_codes = true

[storage]
backend = "memory"
"#
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.workers, Some(2));
        assert_eq!(cfg.api.base_path, "");
        assert!(cfg.api.strict_status_codes);
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        // Untouched sections keep their defaults
        assert_eq!(cfg.http.max_body_size, 1_048_576);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = Config::defaults().unwrap();
        cfg.api.base_path = "api".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::defaults().unwrap();
        cfg.api.base_path = "/api/".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::defaults().unwrap();
        cfg.storage.path = "  ".to_string();
        assert!(cfg.validate().is_err());
        cfg.storage.backend = StorageBackend::Memory;
        assert!(cfg.validate().is_ok());

        let mut cfg = Config::defaults().unwrap();
        cfg.logging.level = "verbose".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::defaults().unwrap();
        cfg.server.host = "not a host".to_string();
        assert!(cfg.validate().is_err());
    }
}
