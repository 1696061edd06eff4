//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client starts against a local API
//! with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use askbar_shared::constants::{DEFAULT_API_URL, DEFAULT_EVENT_BUFFER, FETCH_DEBOUNCE_MS};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the chat API.
    /// Env: `ASKBAR_API_URL`
    /// Default: `http://localhost:8000`
    pub api_url: String,

    /// Directory holding the local storage database.
    /// Env: `ASKBAR_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Window in which repeated chat-list fetches collapse into one.
    /// Env: `ASKBAR_FETCH_DEBOUNCE_MS`
    /// Default: `300`
    pub fetch_debounce: Duration,

    /// Capacity of the store event bus.
    /// Env: `ASKBAR_EVENT_BUFFER`
    /// Default: `256`
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: None,
            fetch_debounce: Duration::from_millis(FETCH_DEBOUNCE_MS),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("ASKBAR_API_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.is_empty() {
                tracing::warn!("Empty ASKBAR_API_URL, using default");
            } else {
                config.api_url = url.to_string();
            }
        }

        if let Some(dir) = lookup("ASKBAR_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(val) = lookup("ASKBAR_FETCH_DEBOUNCE_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.fetch_debounce = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %val, "Invalid ASKBAR_FETCH_DEBOUNCE_MS, using default"),
            }
        }

        if let Some(val) = lookup("ASKBAR_EVENT_BUFFER") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.event_buffer = n,
                _ => tracing::warn!(value = %val, "Invalid ASKBAR_EVENT_BUFFER, using default"),
            }
        }

        config
    }
}
