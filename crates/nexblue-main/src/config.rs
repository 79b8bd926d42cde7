// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of NexBlue Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result};
use nexblue_api::DEFAULT_BASE_URL;
use nexblue_core::DEFAULT_INSTANCE_ID;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const HA_ADDON_OPTIONS: &str = "/data/options.json";

/// Shortest polling interval the cloud API is polled at
pub const MIN_SCAN_INTERVAL_SECS: u64 = 10;

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub account: AccountConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub system: SystemConfig,
}

/// NexBlue account used to log in to the cloud API
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between two polls of every charger
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
        }
    }
}

fn default_scan_interval_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Prefix of every entity unique id
    #[serde(default = "default_instance_id")]
    pub instance_id: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            instance_id: default_instance_id(),
            log_level: default_log_level(),
        }
    }
}

fn default_instance_id() -> String {
    DEFAULT_INSTANCE_ID.to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

/// Where the configuration was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    HaAddonOptions,
    Environment,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::HaAddonOptions => write!(f, "HA addon options"),
            Self::Environment => write!(f, "defaults with environment overrides"),
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path wins. Otherwise the HA addon options, `config.toml`
    /// and `config.json` are tried in that order, falling back to defaults
    /// with environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            let config = Self::from_file(path)?;
            return Ok((config, ConfigSource::File(path.to_path_buf())));
        }

        if let Ok(options_str) = std::fs::read_to_string(HA_ADDON_OPTIONS) {
            let config: AppConfig =
                serde_json::from_str(&options_str).context("Failed to parse HA addon options")?;
            config.validate()?;
            return Ok((config, ConfigSource::HaAddonOptions));
        }

        for candidate in ["config.toml", "config.json"] {
            let path = Path::new(candidate);
            if path.exists() {
                let config = Self::from_file(path)?;
                return Ok((config, ConfigSource::File(path.to_path_buf())));
            }
        }

        let config = Self::from_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok((config, ConfigSource::Environment))
    }

    /// Parse a TOML or JSON file, chosen by extension, and validate it
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let config: AppConfig = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `NEXBLUE_*` variables read through `lookup`
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(username) = lookup("NEXBLUE_USERNAME") {
            config.account.username = username;
        }
        if let Some(password) = lookup("NEXBLUE_PASSWORD") {
            config.account.password = password;
        }

        if let Some(url) = lookup("NEXBLUE_API_BASE_URL") {
            config.api.base_url = url;
        }

        if let Some(interval) = lookup("NEXBLUE_SCAN_INTERVAL_SECS")
            && let Ok(secs) = interval.parse::<u64>()
        {
            config.polling.scan_interval_secs = secs;
        }

        if let Some(level) = lookup("NEXBLUE_LOG_LEVEL") {
            config.system.log_level = level;
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.account.username.trim().is_empty() {
            anyhow::bail!("account.username cannot be empty");
        }
        if self.account.password.is_empty() {
            anyhow::bail!("account.password cannot be empty");
        }

        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            anyhow::bail!(
                "api.base_url must start with http:// or https://, got '{}'",
                self.api.base_url
            );
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be greater than 0");
        }

        if self.polling.scan_interval_secs < MIN_SCAN_INTERVAL_SECS {
            anyhow::bail!(
                "polling.scan_interval_secs must be at least {}, got {}",
                MIN_SCAN_INTERVAL_SECS,
                self.polling.scan_interval_secs
            );
        }

        if self.system.instance_id.is_empty() {
            anyhow::bail!("system.instance_id cannot be empty");
        }
        if !VALID_LOG_LEVELS.contains(&self.system.log_level.to_lowercase().as_str()) {
            anyhow::bail!(
                "system.log_level '{}' is not one of {}",
                self.system.log_level,
                VALID_LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.polling.scan_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}
