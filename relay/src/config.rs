use crate::errors::{Error, Result};
use crate::hub::ConnectionString;
use std::env;

pub const HUB_CONNECTION_STRING: &str = "HUB_CONNECTION_STRING";

const MAX_VIEWER_BUFFER: usize = 65_536;
const MAX_BATCH_SIZE: usize = 10_000;

/// Runtime settings for the relay process.
#[derive(Debug, Clone)]
pub struct Config {
    pub hub: ConnectionString,
    pub http_addr: String,
    pub viewer_buffer: usize,
    pub batch_size: usize,
    pub batch_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Only the hub connection string
    /// is mandatory; everything else falls back to a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(HUB_CONNECTION_STRING)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{} is missing", HUB_CONNECTION_STRING)))?;
        let hub = ConnectionString::parse(&raw)?;

        let http_addr = lookup("HTTP_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string());
        let viewer_buffer = lookup("VIEWER_BUFFER")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(64)
            .clamp(1, MAX_VIEWER_BUFFER);
        let batch_size = lookup("BATCH_SIZE")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(100)
            .clamp(1, MAX_BATCH_SIZE);
        let batch_timeout_ms = lookup("BATCH_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        Ok(Self {
            hub,
            http_addr,
            viewer_buffer,
            batch_size,
            batch_timeout_ms,
        })
    }
}
