use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};

/// Top-level client configuration, loaded from concord-client.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiSection,
    pub cache: CacheSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Versioned API root, without a trailing slash.
    pub base_url: String,
    /// Bot token. Empty means requests go out unauthenticated.
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "https://discord.com/api/v10".into(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Number of messages the message cache keeps before overwriting the oldest.
    pub message_capacity: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            message_capacity: 1024,
        }
    }
}

impl ClientConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("failed to read config file {path}: {e}")))?;
            Self::from_toml(&contents)
                .map_err(|e| Error::Config(format!("failed to parse config file {path}: {e}")))?
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("CONCORD_API_BASE_URL") {
            self.api.base_url = v;
        }
        if let Some(v) = var("CONCORD_TOKEN") {
            self.api.token = v;
        }
        if let Some(v) = var("CONCORD_TIMEOUT_SECS")
            && let Ok(secs) = v.parse()
        {
            self.api.timeout_secs = secs;
        }
        if let Some(v) = var("CONCORD_MESSAGE_CACHE_SIZE")
            && let Ok(size) = v.parse()
        {
            self.cache.message_capacity = size;
        }
    }
}

/// The `User-Agent` sent with every request. Built once and handed to the
/// HTTP client; never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgent(String);

impl UserAgent {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserAgent {
    fn default() -> Self {
        Self(format!(
            "DiscordBot (https://github.com/dollspace-gay/concord, {})",
            env!("CARGO_PKG_VERSION")
        ))
    }
}
