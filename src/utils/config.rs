//! Configuration management for vplay
//!
//! This module handles loading and managing application configuration
//! from various sources including config files and environment variables.

use crate::player::TickPolicy;
use crate::utils::error::{IntoPlayerError, Result, VplayError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Playback controller configuration
    pub playback: PlaybackConfig,

    /// URL history configuration
    pub history: HistoryConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Playback controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Periodic time sampling cadence in milliseconds
    pub tick_interval_ms: u64,

    /// Debounce window for the play/pause transport signal in milliseconds
    pub transport_debounce_ms: u64,

    /// Whether periodic ticks are observed while paused
    pub tick_policy: TickPolicy,

    /// Start playback as soon as the source is ready
    pub auto_play: bool,
}

/// URL history configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record successfully loaded sources
    pub enabled: bool,

    /// History file location (defaults to the user data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// General application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            transport_debounce_ms: 450,
            tick_policy: TickPolicy::WhilePlaying,
            auto_play: true,
        }
    }
}

impl PlaybackConfig {
    /// Periodic tick cadence
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Transport debounce window
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.transport_debounce_ms)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl HistoryConfig {
    /// Resolve the history file location
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            dirs::data_dir().map(|p| p.join("vplay").join("history.json"))
        })
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Upper bound for the transport debounce window
const MAX_DEBOUNCE_MS: u64 = 10_000;

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/vplay/config.toml on Linux)
    /// 3. User config file (~/.config/vplay/config.toml on Linux)
    /// 4. Environment variables (VPLAY_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config.merge_from_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config.merge_from_file(&user_path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from an explicit file, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to user config file
    pub fn save(&self) -> Result<()> {
        let path = Self::user_config_path()
            .ok_or_else(|| VplayError::Config("Cannot determine user config path".to_string()))?;
        self.save_to(&path)
    }

    /// Save configuration to the given path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).config_err("Failed to create config directory")?;
        }

        let toml = toml::to_string_pretty(self).config_err("Failed to serialize config")?;
        std::fs::write(path, toml).config_err("Failed to write config file")?;

        Ok(())
    }

    /// Merge configuration from a TOML file
    ///
    /// Keys set in the file override the current values. Keys it leaves out
    /// keep whatever earlier layers set.
    fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path).config_err("Failed to read config file")?;
        let overlay: toml::Table =
            toml::from_str(&contents).config_err("Failed to parse config file")?;

        let current = toml::Value::try_from(&*self).config_err("Failed to serialize config")?;
        let mut merged: toml::Table = current.try_into().config_err("Failed to serialize config")?;
        merge_tables(&mut merged, overlay);

        *self = toml::Value::Table(merged)
            .try_into()
            .config_err("Failed to parse config file")?;
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `VPLAY_*` overrides from an arbitrary key lookup
    pub(crate) fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(interval) = lookup("VPLAY_TICK_INTERVAL_MS") {
            self.playback.tick_interval_ms = interval
                .parse()
                .map_err(|_| VplayError::Config("Invalid VPLAY_TICK_INTERVAL_MS".to_string()))?;
        }

        if let Some(window) = lookup("VPLAY_DEBOUNCE_MS") {
            self.playback.transport_debounce_ms = window
                .parse()
                .map_err(|_| VplayError::Config("Invalid VPLAY_DEBOUNCE_MS".to_string()))?;
        }

        if let Some(policy) = lookup("VPLAY_TICK_POLICY") {
            self.playback.tick_policy = policy.parse()?;
        }

        if let Some(log_level) = lookup("VPLAY_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.playback.tick_interval_ms == 0 {
            return Err(VplayError::Config("Tick interval must be non-zero".to_string()));
        }

        if self.playback.transport_debounce_ms > MAX_DEBOUNCE_MS {
            return Err(VplayError::Config(format!(
                "Transport debounce must not exceed {}ms",
                MAX_DEBOUNCE_MS
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(VplayError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level, valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/vplay/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA")
            .ok()
            .map(|p| PathBuf::from(p).join("vplay").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/vplay/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vplay").join("config.toml"))
    }
}

/// Recursively overlay `overlay` onto `base`, table by table
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}
