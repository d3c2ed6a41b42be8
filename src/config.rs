//! Configuration for jailwatch
//!
//! Centralized configuration with sensible defaults. Values can come from the
//! builder, a TOML file, or both (builder calls override the file).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{JailwatchError, Result};

/// Default fail2ban socket location
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/fail2ban/fail2ban.sock";

/// Refresh interval used when the configured one is out of range
pub const DEFAULT_REFRESH_SECONDS: u64 = 30;

/// Accepted refresh interval bounds (inclusive)
pub const MIN_REFRESH_SECONDS: u64 = 10;
pub const MAX_REFRESH_SECONDS: u64 = 600;

/// Main configuration for a jailwatch instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Path of the fail2ban Unix domain socket
    pub socket_path: PathBuf,

    /// Socket read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    /// Continue when the daemon reports a version outside the allow-list
    pub skip_version_check: bool,

    // -------------------------------------------------------------------------
    // Refresh Configuration
    // -------------------------------------------------------------------------
    /// Seconds between two refresh passes
    pub refresh_seconds: u64,

    /// Delay before the first refresh pass (milliseconds)
    pub start_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            read_timeout_ms: 30_000,
            write_timeout_ms: 5_000,
            skip_version_check: false,
            refresh_seconds: DEFAULT_REFRESH_SECONDS,
            start_delay_ms: 2_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a config from a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            JailwatchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| JailwatchError::Config(e.to_string()))
    }

    /// Refresh interval after range validation
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(validate_refresh_seconds(self.refresh_seconds))
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}

/// Clamp a refresh interval to the accepted range.
///
/// Values outside `10..=600` fall back to the default of 30 seconds.
pub fn validate_refresh_seconds(seconds: u64) -> u64 {
    if !(MIN_REFRESH_SECONDS..=MAX_REFRESH_SECONDS).contains(&seconds) {
        tracing::warn!(
            "fail2ban data refresh must be between {} and {} seconds, got {}, using {}",
            MIN_REFRESH_SECONDS,
            MAX_REFRESH_SECONDS,
            seconds,
            DEFAULT_REFRESH_SECONDS
        );
        return DEFAULT_REFRESH_SECONDS;
    }
    seconds
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an existing config (e.g. one loaded from a file)
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the fail2ban socket path
    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.socket_path = path.into();
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn skip_version_check(mut self, skip: bool) -> Self {
        self.config.skip_version_check = skip;
        self
    }

    /// Set the refresh interval (in seconds)
    pub fn refresh_seconds(mut self, seconds: u64) -> Self {
        self.config.refresh_seconds = seconds;
        self
    }

    /// Set the delay before the first refresh (in milliseconds)
    pub fn start_delay_ms(mut self, ms: u64) -> Self {
        self.config.start_delay_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
