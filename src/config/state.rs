// Application state module
// Shared, read-only state handed to every connection

use std::sync::Arc;

use super::types::Config;
use crate::logger::LogFormat;
use crate::store::PostStore;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Injected storage collaborator
    pub store: Arc<dyn PostStore>,
    /// Parsed once so the access log does not re-parse per request
    pub access_log_format: LogFormat,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn PostStore>) -> Self {
        let access_log_format = config.access_log_format();
        Self {
            config,
            store,
            access_log_format,
        }
    }
}
