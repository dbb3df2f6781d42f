use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub const ENV_API_BASE_URL: &str = "BRAND_CONSOLE_API_BASE_URL";
pub const ENV_ORIGIN: &str = "BRAND_CONSOLE_ORIGIN";
pub const ENV_TIMEOUT_MS: &str = "BRAND_CONSOLE_TIMEOUT_MS";
pub const ENV_STORE_PATH: &str = "BRAND_CONSOLE_STORE_PATH";

pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:3000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const STORE_FILE_NAME: &str = "credentials.v1.json";

pub const BASE_SOURCE_EXPLICIT: &str = "explicit";
pub const BASE_SOURCE_STORED: &str = "stored";
pub const BASE_SOURCE_DEFAULT: &str = "configured_default";
pub const BASE_SOURCE_ORIGIN: &str = "origin";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("invalid BRAND_CONSOLE_API_BASE_URL: {0}")]
    InvalidApiBaseUrl(String),
    #[error("invalid BRAND_CONSOLE_ORIGIN: {0}")]
    InvalidOrigin(String),
    #[error("invalid BRAND_CONSOLE_TIMEOUT_MS: {0}")]
    InvalidTimeout(String),
}

/// Process-level client settings. The origin stands in for the page origin a
/// browser would fall back to when nothing else names an API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub default_api_base_url: Option<String>,
    pub origin: String,
    pub timeout_ms: u64,
    pub store_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_api_base_url: None,
            origin: DEFAULT_ORIGIN.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            store_path: default_store_path(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_api_base_url = match env_non_empty(ENV_API_BASE_URL) {
            Some(raw) => Some(
                normalize_base_url(&raw)
                    .map_err(|error| ConfigError::InvalidApiBaseUrl(error.to_string()))?,
            ),
            None => None,
        };
        let origin = normalize_base_url(
            env_non_empty(ENV_ORIGIN)
                .unwrap_or_else(|| DEFAULT_ORIGIN.to_string())
                .as_str(),
        )
        .map_err(|error| ConfigError::InvalidOrigin(error.to_string()))?;
        let timeout_ms = match env_non_empty(ENV_TIMEOUT_MS) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|error| ConfigError::InvalidTimeout(error.to_string()))?,
            None => DEFAULT_TIMEOUT_MS,
        };
        let store_path = env_non_empty(ENV_STORE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(default_store_path);

        Ok(Self {
            default_api_base_url,
            origin,
            timeout_ms,
            store_path,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBaseUrl {
    pub base_url: String,
    pub source: &'static str,
}

/// Picks the API base: explicit argument, then the persisted choice, then the
/// configured default, then the origin.
#[must_use]
pub fn resolve_api_base_url(
    explicit: Option<&str>,
    stored: Option<&str>,
    config: &ClientConfig,
) -> ResolvedBaseUrl {
    let candidates = [
        (explicit, BASE_SOURCE_EXPLICIT),
        (stored, BASE_SOURCE_STORED),
        (config.default_api_base_url.as_deref(), BASE_SOURCE_DEFAULT),
    ];
    for (candidate, source) in candidates {
        if let Some(base_url) = candidate.and_then(|raw| normalize_base_url(raw).ok()) {
            return ResolvedBaseUrl { base_url, source };
        }
    }
    ResolvedBaseUrl {
        base_url: config.origin.trim().trim_end_matches('/').to_string(),
        source: BASE_SOURCE_ORIGIN,
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn default_store_path() -> PathBuf {
    if let Some(mut data_dir) = dirs::data_local_dir() {
        data_dir.push("brand-console");
        data_dir.push(STORE_FILE_NAME);
        return data_dir;
    }

    if let Some(mut home_dir) = dirs::home_dir() {
        home_dir.push(".brand-console");
        home_dir.push(STORE_FILE_NAME);
        return home_dir;
    }

    PathBuf::from(STORE_FILE_NAME)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
