//! Configuration system using Figment.
//!
//! This module provides strongly-typed configuration loading for the monitor.
//! Configuration is loaded from:
//! 1. `flamewatch.toml` file (base configuration)
//! 2. Environment variables (prefixed with `FLAMEWATCH_`, sections separated
//!    by double underscores, e.g. `FLAMEWATCH_APPLICATION__LOG_LEVEL=debug`)
//!
//! Every section has serde defaults, so a missing file or an empty file yields
//! a fully usable configuration. Semantic checks that serde cannot express
//! (threshold ordering, non-zero capacities) live in
//! [`MonitorConfig::validate`].

use crate::error::{MonitorError, MonitorResult};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file consulted when the operator supplies none.
pub const DEFAULT_CONFIG_PATH: &str = "flamewatch.toml";

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Application settings.
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Hub link settings (serial and TCP strategies).
    #[serde(default)]
    pub link: LinkConfig,
    /// Alarm classification settings.
    #[serde(default)]
    pub alarm: AlarmSettings,
    /// Rolling chart history settings.
    #[serde(default)]
    pub history: HistorySettings,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name reported in logs.
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Settings for both link strategies. The active strategy is chosen by the
/// CLI subcommand; both sections always parse so a single file can describe
/// either deployment mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial (USB) link parameters.
    #[serde(default)]
    pub serial: SerialLinkConfig,
    /// Local-network socket link parameters.
    #[serde(default)]
    pub tcp: TcpLinkConfig,
}

/// Serial link parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialLinkConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0", "COM3").
    #[serde(default = "default_serial_port")]
    pub port: String,
    /// Communication speed. The hub firmware talks at 9600 baud.
    #[serde(default = "default_baud_rate")]
    pub baud: u32,
}

/// TCP socket link parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpLinkConfig {
    /// Hub host address.
    #[serde(default = "default_tcp_host")]
    pub host: String,
    /// Hub listening port.
    #[serde(default = "default_tcp_port")]
    pub port: u16,
}

/// Intensity classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmSettings {
    /// Intensities strictly above this value classify as fire.
    #[serde(default = "default_fire_threshold")]
    pub fire_threshold: i32,
    /// Intensities strictly below this value classify as safe.
    #[serde(default = "default_safe_threshold")]
    pub safe_threshold: i32,
}

/// Rolling history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Maximum number of retained chart points.
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

// Default value functions
fn default_app_name() -> String {
    "flamewatch".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_tcp_host() -> String {
    "192.168.4.1".to_string()
}

fn default_tcp_port() -> u16 {
    3333
}

fn default_fire_threshold() -> i32 {
    75
}

fn default_safe_threshold() -> i32 {
    20
}

fn default_history_capacity() -> usize {
    20
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for SerialLinkConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud: default_baud_rate(),
        }
    }
}

impl Default for TcpLinkConfig {
    fn default() -> Self {
        Self {
            host: default_tcp_host(),
            port: default_tcp_port(),
        }
    }
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            fire_threshold: default_fire_threshold(),
            safe_threshold: default_safe_threshold(),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from `flamewatch.toml` and environment variables.
    ///
    /// Environment variables can override configuration with prefix
    /// `FLAMEWATCH_`, e.g. `FLAMEWATCH_LINK__SERIAL__BAUD=115200`.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FLAMEWATCH_").split("__"))
            .extract()
    }

    /// Load from a file and run semantic validation in one step.
    pub fn load_checked<P: AsRef<Path>>(path: P) -> MonitorResult<Self> {
        let config = Self::load_from(path)?;
        config.validate().map_err(MonitorError::Configuration)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.link.serial.baud == 0 {
            return Err("Serial baud rate must be non-zero".to_string());
        }

        if self.link.tcp.host.trim().is_empty() {
            return Err("TCP host must not be empty".to_string());
        }

        if self.alarm.safe_threshold >= self.alarm.fire_threshold {
            return Err(format!(
                "safe_threshold ({}) must be below fire_threshold ({})",
                self.alarm.safe_threshold, self.alarm.fire_threshold
            ));
        }

        if self.history.capacity == 0 {
            return Err("History capacity must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = MonitorConfig::default();
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.link.serial.baud, 9600);
        assert_eq!(config.link.tcp.port, 3333);
        assert_eq!(config.alarm.fire_threshold, 75);
        assert_eq!(config.alarm.safe_threshold, 20);
        assert_eq!(config.history.capacity, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = MonitorConfig::load_from("/nonexistent/flamewatch.toml")
            .expect("missing file should still yield defaults");
        assert!(config.validate().is_ok());
        assert_eq!(config.history.capacity, 20);
    }

    #[test]
    fn test_partial_file_overrides_only_named_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("flamewatch.toml");
        let mut file = std::fs::File::create(&path).expect("create config");
        writeln!(
            file,
            "[link.serial]\nport = \"/dev/ttyACM1\"\n\n[history]\ncapacity = 40\n"
        )
        .expect("write config");

        let config = MonitorConfig::load_from(&path).expect("load config");
        assert_eq!(config.link.serial.port, "/dev/ttyACM1");
        assert_eq!(config.link.serial.baud, 9600);
        assert_eq!(config.history.capacity, 40);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = MonitorConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = MonitorConfig::default();
        config.alarm.safe_threshold = 80;
        let err = config.validate().expect_err("thresholds out of order");
        assert!(err.contains("safe_threshold"));
    }

    #[test]
    fn test_zero_history_capacity_rejected() {
        let mut config = MonitorConfig::default();
        config.history.capacity = 0;
        assert!(config.validate().is_err());
    }
}
