//! Config file tests
//!
//! Run with: cargo test --test config_test

use obs_remote::{Config, ObsError};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.url = "ws://studio:4455".to_string();
    config.password = Some("secret".to_string());
    config.screenshot.format = "jpg".to_string();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.url, "ws://studio:4455");
    assert_eq!(loaded.password.as_deref(), Some("secret"));
    assert_eq!(loaded.screenshot.format, "jpg");
    assert_eq!(loaded.screenshot.width, 480);
}

#[test]
fn test_partial_file_gets_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "request_timeout_secs = 3\n\n[screenshot]\nwidth = 1280\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.url, "ws://localhost:4444");
    assert!(config.password.is_none());
    assert_eq!(config.request_timeout(), Some(Duration::from_secs(3)));
    assert_eq!(config.screenshot.width, 1280);
    assert_eq!(config.screenshot.height, 270);
    assert_eq!(config.screenshot.format, "png");
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.url, "ws://localhost:4444");
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "url = [not toml").unwrap();

    assert!(matches!(Config::load(&path), Err(ObsError::Config(_))));
}
