//! Configuration management for checkin.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "checkin";

/// Environment variable holding the check-in endpoint.
pub const API_URL_ENV: &str = "CHECKIN_API_URL";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. `CHECKIN_API_URL` for the endpoint
/// 2. Environment variables prefixed with `CHECKIN_` (`__` separates tables)
/// 3. TOML config file at `~/.config/checkin/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Check-in endpoint configuration.
    pub api: ApiConfig,
    /// Decoding capability configuration.
    pub scanner: ScannerConfig,
    /// Status display configuration.
    pub display: DisplayConfig,
    /// File the configuration was loaded from.
    #[serde(skip)]
    source: Option<PathBuf>,
}

/// Check-in endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL queried as `GET <url>?id=<value>`.
    pub url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Decoding capability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Viewport element the capability is bound to.
    pub element_id: String,
    /// Target decode rate, in frames per second.
    pub fps: u32,
    /// Width of the detection region.
    pub qrbox_width: u32,
    /// Height of the detection region.
    pub qrbox_height: u32,
}

/// Status display configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Header shown above the status region.
    pub title: String,
    /// How long an outcome from the endpoint stays visible, in milliseconds.
    pub remote_clear_ms: u64,
    /// How long a local connection-error outcome stays visible, in milliseconds.
    pub error_clear_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 15_000,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            element_id: "qr-reader".to_string(),
            fps: 10,
            qrbox_width: 250,
            qrbox_height: 250,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "Hệ thống Check-in Đại hội LCĐ KHMT".to_string(),
            remote_clear_ms: 5_000,
            error_clear_ms: 1_000,
        }
    }
}

impl ScannerConfig {
    /// Minimum spacing between two decoded frames.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        (Duration::from_secs(1) / self.fps.max(1)).max(Duration::from_nanos(1))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("CHECKIN_").split("__"))
            .merge(Env::raw().only(&[API_URL_ENV]).map(|_| "api.url".into()));

        let mut config: Config = figment.extract()?;
        config.source = Some(config_file);
        config.validate()?;
        Ok(config)
    }

    /// The file this configuration was loaded from, or the default location
    /// when it was built in code.
    #[must_use]
    pub fn source_path(&self) -> PathBuf {
        self.source
            .clone()
            .unwrap_or_else(Self::default_config_path)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api.url {
            if let Err(e) = reqwest::Url::parse(url) {
                return Err(Error::ConfigValidation {
                    message: format!("api.url is not a valid URL ({url}): {e}"),
                });
            }
        }

        if self.api.timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "api.timeout_ms must be greater than 0".to_string(),
            });
        }

        if self.scanner.fps == 0 {
            return Err(Error::ConfigValidation {
                message: "scanner.fps must be greater than 0".to_string(),
            });
        }

        if self.scanner.qrbox_width == 0 || self.scanner.qrbox_height == 0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "scanner detection region must be non-empty (got {}x{})",
                    self.scanner.qrbox_width, self.scanner.qrbox_height
                ),
            });
        }

        Ok(())
    }

    /// Get the configured endpoint, failing if none was set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingApiUrl`] if no endpoint is configured.
    pub fn api_url(&self) -> Result<&str> {
        self.api
            .url
            .as_deref()
            .ok_or_else(|| Error::MissingApiUrl {
                path: self.source_path(),
            })
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }

    /// Get the display timings as Durations.
    #[must_use]
    pub fn display_timings(&self) -> DisplayTimings {
        DisplayTimings {
            remote: Duration::from_millis(self.display.remote_clear_ms),
            local_error: Duration::from_millis(self.display.error_clear_ms),
        }
    }
}

/// How long each kind of outcome stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayTimings {
    /// Outcomes reported by the endpoint.
    pub remote: Duration,
    /// Connection errors synthesized locally.
    pub local_error: Duration,
}

impl Default for DisplayTimings {
    fn default() -> Self {
        Config::default().display_timings()
    }
}
