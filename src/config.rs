use crate::entry::EntryMode;
use reqwest::Url;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_BASE_URL '{value}' is not a usable base URL: {reason}")]
    InvalidBaseUrl { value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: Url,
    pub port: u16,
    pub entry_mode: EntryMode,
    /// Dashboards untouched for this long are dropped from memory.
    pub session_idle: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = env::var("API_BASE_URL").unwrap_or_else(|_| {
            info!("API_BASE_URL not set, using default: {DEFAULT_API_BASE_URL}");
            DEFAULT_API_BASE_URL.to_string()
        });

        Ok(Self {
            api_base_url: parse_base_url(&base)?,
            port: port_from(env::var("PORT").ok()),
            entry_mode: entry_mode_from(env::var("ENTRY_MODE").ok()),
            session_idle: session_idle_from(env::var("SESSION_IDLE_SECS").ok()),
        })
    }
}

pub fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value.trim()).map_err(|err| invalid(err.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) URL".into()));
    }
    Ok(url)
}

fn port_from(value: Option<String>) -> u16 {
    match value.map(|value| value.parse::<u16>()) {
        Some(Ok(port)) => port,
        Some(Err(err)) => {
            warn!("Invalid PORT value: {err}, using default: {DEFAULT_PORT}");
            DEFAULT_PORT
        }
        None => DEFAULT_PORT,
    }
}

fn entry_mode_from(value: Option<String>) -> EntryMode {
    match value.map(|value| value.parse::<EntryMode>()) {
        Some(Ok(mode)) => mode,
        Some(Err(err)) => {
            warn!("Invalid ENTRY_MODE value: {err}, using default");
            EntryMode::default()
        }
        None => EntryMode::default(),
    }
}

fn session_idle_from(value: Option<String>) -> Duration {
    let secs = match value.map(|value| value.parse::<u64>()) {
        Some(Ok(secs)) if secs > 0 => secs,
        Some(Ok(_)) => {
            warn!("SESSION_IDLE_SECS must be positive, using default: {DEFAULT_SESSION_IDLE_SECS}");
            DEFAULT_SESSION_IDLE_SECS
        }
        Some(Err(err)) => {
            warn!("Invalid SESSION_IDLE_SECS value: {err}, using default: {DEFAULT_SESSION_IDLE_SECS}");
            DEFAULT_SESSION_IDLE_SECS
        }
        None => DEFAULT_SESSION_IDLE_SECS,
    };
    Duration::from_secs(secs)
}
