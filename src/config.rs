//! Client configuration parsing and validation.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{AppError, Result};

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_request_timeout_seconds() -> u64 {
    30
}

/// Client configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    /// Base URL of the backend agent service, e.g. `http://127.0.0.1:8000`.
    pub backend_url: String,
    /// Interval between authoritative state polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-request timeout for plain REST calls, in seconds. Does not
    /// apply to the long-lived event stream.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl ClientConfig {
    /// Build a configuration from a backend URL with default timings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the URL is empty.
    pub fn new(backend_url: impl Into<String>) -> Result<Self> {
        let mut config = Self {
            backend_url: backend_url.into(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_seconds: default_request_timeout_seconds(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize the backend URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        let trimmed = self.backend_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(AppError::Config("backend_url must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        self.backend_url = trimmed.to_owned();
        Ok(())
    }
}
