//! Fetch configuration.
//!
//! Controls the bundled fetchers used by [`RoutingFetcher`](crate::fetch::RoutingFetcher).
//! Load from environment variables with [`FetchConfig::from_env()`] or from
//! a YAML file with [`FetchConfig::from_yaml_file()`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for resolving `$ref` documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// HTTP request timeout in seconds. Default: 30.
    pub timeout_secs: u64,
    /// Whether `http`/`https` references may be fetched over the network.
    pub allow_http: bool,
    /// Directory that relative reference paths resolve against.
    pub base_dir: Option<PathBuf>,
    /// URL prefix → local directory. A reference under a prefix is read
    /// from the directory instead of the network.
    pub mirrors: BTreeMap<String, PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            allow_http: true,
            base_dir: None,
            mirrors: BTreeMap::new(),
        }
    }
}

impl FetchConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CONCORDIA_FETCH_TIMEOUT_SECS` (default: 30)
    /// - `CONCORDIA_ALLOW_HTTP` (default: true)
    /// - `CONCORDIA_BASE_DIR` (default: unset)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env()`](Self::from_env) with an explicit variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup("CONCORDIA_FETCH_TIMEOUT_SECS") {
            config.timeout_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "CONCORDIA_FETCH_TIMEOUT_SECS".to_string(),
                reason: format!("expected a whole number of seconds, got '{raw}'"),
            })?;
        }
        if let Some(raw) = lookup("CONCORDIA_ALLOW_HTTP") {
            config.allow_http = parse_bool("CONCORDIA_ALLOW_HTTP", &raw)?;
        }
        if let Some(raw) = lookup("CONCORDIA_BASE_DIR").filter(|s| !s.is_empty()) {
            config.base_dir = Some(PathBuf::from(raw));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check values that deserialization alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        for prefix in self.mirrors.keys() {
            Url::parse(prefix).map_err(|e| ConfigError::InvalidValue {
                key: format!("mirrors.{prefix}"),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected a boolean, got '{raw}'"),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
