//! Configuration for obs-remote

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ObsError;
use crate::obs::requests::{
    DEFAULT_SCREENSHOT_FORMAT, DEFAULT_SCREENSHOT_HEIGHT, DEFAULT_SCREENSHOT_WIDTH,
};

/// Default config file location
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("obs-remote")
        .join("config.toml")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// obs-websocket URL
    #[serde(default = "default_url")]
    pub url: String,

    /// obs-websocket password, if the server requires one
    #[serde(default)]
    pub password: Option<String>,

    /// Per-command timeout in seconds (0 = wait forever)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Defaults for the screenshot command
    #[serde(default)]
    pub screenshot: ScreenshotDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotDefaults {
    #[serde(default = "default_screenshot_format")]
    pub format: String,
    #[serde(default = "default_screenshot_width")]
    pub width: u32,
    #[serde(default = "default_screenshot_height")]
    pub height: u32,
}

fn default_url() -> String {
    "ws://localhost:4444".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_screenshot_format() -> String {
    DEFAULT_SCREENSHOT_FORMAT.to_string()
}

fn default_screenshot_width() -> u32 {
    DEFAULT_SCREENSHOT_WIDTH
}

fn default_screenshot_height() -> u32 {
    DEFAULT_SCREENSHOT_HEIGHT
}

impl Default for ScreenshotDefaults {
    fn default() -> Self {
        Self {
            format: default_screenshot_format(),
            width: DEFAULT_SCREENSHOT_WIDTH,
            height: DEFAULT_SCREENSHOT_HEIGHT,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            password: None,
            request_timeout_secs: 10,
            screenshot: ScreenshotDefaults::default(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ObsError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ObsError::Config(e.to_string()))
    }

    /// Load config from file if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ObsError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ObsError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ObsError::Config(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `None` means no timeout
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.url, "ws://localhost:4444");
        assert!(config.password.is_none());
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.screenshot.format, "png");
        assert_eq!((config.screenshot.width, config.screenshot.height), (480, 270));
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = default_config_path();
        assert!(path.ends_with("obs-remote/config.toml"));
    }
}
