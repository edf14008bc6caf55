//! Logger module
//!
//! Provides logging utilities for the post server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Store failure, error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::{AccessLogEntry, LogFormat};

use crate::config::{Config, StorageBackend, StorageConfig};
use crate::store::StoreError;
use std::net::SocketAddr;
use std::str::FromStr;

/// Log severity, ordered from least to most verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" | "trace" => Ok(Self::Debug),
            other => Err(format!("Unknown log level: '{other}'")),
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    let level = config
        .logging
        .level
        .parse()
        .map_err(|e: String| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        level,
    )
}

fn write(level: Level, message: &str) {
    match writer::get() {
        Some(w) => w.write(level, message),
        None => match level {
            Level::Error | Level::Warn => eprintln!("{message}"),
            Level::Info | Level::Debug => println!("{message}"),
        },
    }
}

pub fn write_info(message: &str) {
    write(Level::Info, message);
}

fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Post server started successfully");
    write_info(&format!(
        "Listening on: http://{addr}{}/posts",
        config.api.base_path
    ));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    if config.health.enabled {
        write_info(&format!(
            "Health checks: {} {}",
            config.health.liveness_path, config.health.readiness_path
        ));
    }
    write_info("======================================\n");
}

pub fn log_store_opened(config: &Config) {
    write_info(&store_description(&config.storage));
}

fn store_description(storage: &StorageConfig) -> String {
    let detail = match storage.backend {
        StorageBackend::Sqlite => format!("database at {}", storage.path),
        StorageBackend::Memory => "data is lost on exit".to_string(),
    };
    format!("[Store] {} backend, {detail}", storage.backend)
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write(Level::Debug, &format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write(Level::Warn, &format!("[WARN] {message}"));
}

/// Store failure surfaced to a client as a 500
pub fn log_store_error(context: &str, err: &StoreError) {
    write(Level::Error, &format!("[STORE ERROR] {context}: {err}"));
}

pub fn log_headers_count(count: usize, show: bool) {
    if show {
        write(Level::Debug, &format!("[Headers] Count: {count}"));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &LogFormat) {
    write_access(&entry.format(format));
}

pub fn log_shutdown(reason: &str) {
    write_info(&format!("\n[Shutdown] {reason}, no longer accepting connections"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!("INFO".parse::<Level>(), Ok(Level::Info));
        assert_eq!("warning".parse::<Level>(), Ok(Level::Warn));
        assert_eq!("trace".parse::<Level>(), Ok(Level::Debug));
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_store_description() {
        let sqlite = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: "data/posts.db3".to_string(),
        };
        assert_eq!(
            store_description(&sqlite),
            "[Store] sqlite backend, database at data/posts.db3"
        );

        let memory = StorageConfig {
            backend: StorageBackend::Memory,
            path: String::new(),
        };
        assert_eq!(
            store_description(&memory),
            "[Store] memory backend, data is lost on exit"
        );
    }
}
