//! Configuration loading tests
//!
//! These touch process environment variables, so they run serially.

use anyhow::Result;
use serial_test::serial;
use std::time::Duration;
use tempfile::TempDir;
use vplay::utils::Config;
use vplay::{TickPolicy, VplayError};

const ENV_KEYS: [&str; 4] = [
    "VPLAY_TICK_INTERVAL_MS",
    "VPLAY_DEBOUNCE_MS",
    "VPLAY_TICK_POLICY",
    "VPLAY_LOG_LEVEL",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_file_values_are_loaded() -> Result<()> {
    clear_env();
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[playback]\ntick_interval_ms = 500\ntick_policy = \"continuous\"\n",
    )?;

    let config = Config::load_from(&path)?;
    assert_eq!(config.playback.tick_interval(), Duration::from_millis(500));
    assert_eq!(config.playback.tick_policy, TickPolicy::Continuous);
    // Keys missing from the file keep their defaults
    assert_eq!(config.playback.debounce_window(), Duration::from_millis(450));
    assert!(config.playback.auto_play);
    assert_eq!(config.general.log_level, "info");

    Ok(())
}

#[test]
#[serial]
fn test_environment_overrides_file() -> Result<()> {
    clear_env();
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[playback]\ntransport_debounce_ms = 300\n")?;

    std::env::set_var("VPLAY_DEBOUNCE_MS", "200");
    std::env::set_var("VPLAY_TICK_POLICY", "while-playing");
    std::env::set_var("VPLAY_LOG_LEVEL", "debug");
    let config = Config::load_from(&path);
    clear_env();

    let config = config?;
    assert_eq!(config.playback.debounce_window(), Duration::from_millis(200));
    assert_eq!(config.playback.tick_policy, TickPolicy::WhilePlaying);
    assert_eq!(config.general.log_level, "debug");

    Ok(())
}

#[test]
#[serial]
fn test_invalid_environment_is_rejected() -> Result<()> {
    clear_env();
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "")?;

    std::env::set_var("VPLAY_TICK_INTERVAL_MS", "0");
    let zero_interval = Config::load_from(&path);
    clear_env();
    assert!(matches!(zero_interval, Err(VplayError::Config(_))));

    std::env::set_var("VPLAY_TICK_POLICY", "sometimes");
    let bad_policy = Config::load_from(&path);
    clear_env();
    assert!(matches!(bad_policy, Err(VplayError::InvalidInput(_))));

    Ok(())
}

#[test]
#[serial]
fn test_saved_config_loads_back() -> Result<()> {
    clear_env();
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.playback.auto_play = false;
    config.history.enabled = false;
    config.save_to(&path)?;

    let loaded = Config::load_from(&path)?;
    assert!(!loaded.playback.auto_play);
    assert!(!loaded.history.enabled);

    Ok(())
}
