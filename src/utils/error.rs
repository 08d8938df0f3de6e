//! Error types for vplay
//!
//! This module defines custom error types used throughout the crate.
//! We use thiserror for convenient error type definitions and anyhow for
//! application-level error handling in the binary.
//!
//! Note that load failures never show up here: the engine reports them as
//! `PlaybackStatus::Failed`, not as an `Err`.

use thiserror::Error;

/// Main error type for vplay
#[derive(Error, Debug)]
pub enum VplayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// History store errors
    #[error("History error: {0}")]
    History(String),

    /// (De)serialization of persisted data
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error for unexpected situations
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results in vplay
pub type Result<T> = std::result::Result<T, VplayError>;

/// Extension trait for converting other errors to VplayError
pub trait IntoPlayerError<T> {
    /// Convert this error into a VplayError with the given context
    fn config_err(self, context: &str) -> Result<T>;
    fn history_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoPlayerError<T> for std::result::Result<T, E> {
    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| VplayError::Config(format!("{}: {}", context, e)))
    }

    fn history_err(self, context: &str) -> Result<T> {
        self.map_err(|e| VplayError::History(format!("{}: {}", context, e)))
    }
}

/// Helper macro for creating internal errors with file and line information
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::utils::error::VplayError::Internal(
            format!("{} at {}:{}", $msg, file!(), line!())
        )
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::utils::error::VplayError::Internal(
            format!("{} at {}:{}", format!($fmt, $($arg)*), file!(), line!())
        )
    };
}
