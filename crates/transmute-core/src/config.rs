//! Configuration module
//!
//! Client configuration is read from the environment (optionally seeded from a
//! `.env` file) and validated before any client is built.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:3313";
const DEFAULT_API_PREFIX: &str = "/api";
const HTTP_TIMEOUT_SECS: u64 = 60;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const POLL_INTERVAL_SECS: u64 = 5;

/// Settings shared by the HTTP client and the CLI
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_prefix: String,
    pub http_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            poll_interval_secs: POLL_INTERVAL_SECS,
            download_dir: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    /// Load configuration from TRANSMUTE_* variables (API_URL is accepted as a fallback).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("TRANSMUTE_API_URL")
            .or_else(|| lookup("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let api_prefix = lookup("TRANSMUTE_API_PREFIX")
            .unwrap_or_else(|| DEFAULT_API_PREFIX.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let config = ClientConfig {
            api_url,
            api_prefix,
            http_timeout_secs: parse_secs(
                lookup("TRANSMUTE_HTTP_TIMEOUT_SECS"),
                "TRANSMUTE_HTTP_TIMEOUT_SECS",
                HTTP_TIMEOUT_SECS,
            )?,
            connect_timeout_secs: parse_secs(
                lookup("TRANSMUTE_CONNECT_TIMEOUT_SECS"),
                "TRANSMUTE_CONNECT_TIMEOUT_SECS",
                CONNECT_TIMEOUT_SECS,
            )?,
            poll_interval_secs: parse_secs(
                lookup("TRANSMUTE_POLL_INTERVAL_SECS"),
                "TRANSMUTE_POLL_INTERVAL_SECS",
                POLL_INTERVAL_SECS,
            )?,
            download_dir: lookup("TRANSMUTE_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "TRANSMUTE_API_URL must start with http:// or https:// (got '{}')",
                self.api_url
            ));
        }

        // An empty prefix is allowed for servers mounted at the root.
        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(anyhow::anyhow!(
                "TRANSMUTE_API_PREFIX must start with '/' (got '{}')",
                self.api_prefix
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "TRANSMUTE_HTTP_TIMEOUT_SECS must be greater than 0"
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "TRANSMUTE_CONNECT_TIMEOUT_SECS must be greater than 0"
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "TRANSMUTE_POLL_INTERVAL_SECS must be greater than 0"
            ));
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Replace the base URL, keeping every other setting.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }
}

fn parse_secs(value: Option<String>, name: &str, default: u64) -> Result<u64, anyhow::Error> {
    match value {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number of seconds", name)),
        None => Ok(default),
    }
}
