use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

use crate::ConfigError;

pub const REMOTE_URL_ENV: &str = "SUBFOX_REMOTE_URL";
pub const ANON_KEY_ENV: &str = "SUBFOX_ANON_KEY";

/// User-configurable settings for the CLI and the sync layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Identity that runs entirely offline against the local cache.
    #[serde(default = "Config::default_sandbox_user")]
    pub sandbox_user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional cache directory. Defaults to `<data dir>/cache`.
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "Config::default_currency_value")]
    pub default_currency: String,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            sandbox_user: Self::default_sandbox_user(),
            cache_dir: None,
            default_currency: Self::default_currency_value(),
            ui_color_enabled: Self::default_ui_color_enabled(),
        }
    }
}

impl Config {
    pub fn default_sandbox_user() -> String {
        "test".into()
    }

    pub fn default_currency_value() -> String {
        "EUR".into()
    }

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn resolve_cache_dir(&self, data_dir: &std::path::Path) -> PathBuf {
        match &self.cache_dir {
            Some(path) => path.clone(),
            None => data_dir.join("cache"),
        }
    }

    /// Applies `SUBFOX_REMOTE_URL` and `SUBFOX_ANON_KEY` from the process
    /// environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(url) = present(REMOTE_URL_ENV) {
            self.remote.url = Some(url.trim().to_string());
        }
        if let Some(key) = present(ANON_KEY_ENV) {
            self.remote.anon_key = Some(key.trim().to_string());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sandbox_user.trim().is_empty() {
            return Err(ConfigError::Invalid("sandbox_user must not be empty".into()));
        }
        let code = self.default_currency.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid(format!(
                "default_currency `{}` is not a three-letter code",
                self.default_currency
            )));
        }
        self.remote.validate()
    }
}

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
    #[serde(default = "RemoteConfig::default_table")]
    pub table: String,
    #[serde(default = "RemoteConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "RemoteConfig::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            table: Self::default_table(),
            timeout_secs: Self::default_timeout_secs(),
            connect_timeout_secs: Self::default_connect_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn default_table() -> String {
        "subscriptions".into()
    }

    pub fn default_timeout_secs() -> u64 {
        30
    }

    pub fn default_connect_timeout_secs() -> u64 {
        10
    }

    /// `true` once both the backend URL and the public key are known.
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.anon_key.is_some()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "remote.url `{url}` must start with http:// or https://"
                )));
            }
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::Invalid("remote.table must not be empty".into()));
        }
        if self.timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("remote timeouts must be positive".into()));
        }
        Ok(())
    }
}
