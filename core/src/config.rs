//! Adapter configuration.
//!
//! Credentials are read once and never change for the lifetime of a
//! `HabiticaTools`. Loading merges, lowest to highest precedence:
//! 1. Programmatic defaults (`HabiticaConfig::default`)
//! 2. Environment variables with the `HABITICA_` prefix
//!
//! After extraction the config is validated; missing credentials are a hard
//! error, never a per-call one.

use std::time::Duration;

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://habitica.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CLIENT_LABEL: &str = "HabiticaTools";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HabiticaConfig {
    /// Sent as `x-api-user`.
    pub user_id: String,
    /// Sent as `x-api-key`.
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Suffix of the `x-client` header.
    pub client_label: String,
    pub log_level: String,
}

impl Default for HabiticaConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            client_label: DEFAULT_CLIENT_LABEL.to_string(),
            log_level: "info".to_string(),
        }
    }
}

// api_key stays out of Debug output so configs can be logged.
impl std::fmt::Debug for HabiticaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HabiticaConfig")
            .field("user_id", &self.user_id)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("client_label", &self.client_label)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl HabiticaConfig {
    /// Build a validated config from explicit credentials and defaults for
    /// everything else.
    pub fn new(user_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            user_id: user_id.into(),
            api_key: api_key.into(),
            ..Self::default()
        };
        config.validated()
    }

    /// Load from `HABITICA_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Env::prefixed("HABITICA_")),
        )
    }

    /// Extract and validate from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validated()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        self.base_url = base_url.into();
        self.validated()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Value of the `x-client` header.
    pub fn client_id(&self) -> String {
        format!("{}-{}", self.user_id, self.client_label)
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.user_id = self.user_id.trim().to_string();
        self.api_key = self.api_key.trim().to_string();
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();

        if self.user_id.is_empty() {
            return Err(ConfigError::MissingCredential("HABITICA_USER_ID"));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingCredential("HABITICA_API_KEY"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log_level));
        }
        Ok(self)
    }
}
