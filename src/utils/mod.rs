//! Utility module for vplay
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Configuration management
//! - Time formatting for the published text fields

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::{Config, GeneralConfig, HistoryConfig, PlaybackConfig};
pub use error::{IntoPlayerError, Result, VplayError};

/// Placeholder shown while a time value is not known
pub const UNKNOWN_TIME_TEXT: &str = "--:--";

/// Initialize the application configuration
///
/// Loads configuration from:
/// 1. Default values
/// 2. System configuration file
/// 3. User configuration file
/// 4. Environment variables
///
/// # Returns
///
/// Returns the loaded configuration or an error if loading fails
pub fn load_config() -> Result<Config> {
    Config::load()
}

/// Format a playback time for display
///
/// Whole seconds only, as `"mm:ss"`. Minutes are not wrapped into hours, so
/// 3725 seconds renders as `"62:05"`.
///
/// # Arguments
///
/// * `seconds` - Time in seconds
///
/// # Returns
///
/// The formatted text, or [`UNKNOWN_TIME_TEXT`] for NaN, infinite or
/// negative input (live streams report an indefinite duration).
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return UNKNOWN_TIME_TEXT.to_string();
    }

    let total_secs = seconds.floor() as u64;
    let minutes = total_secs / 60;
    let secs = total_secs % 60;

    format!("{:02}:{:02}", minutes, secs)
}
