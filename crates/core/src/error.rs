//! Error types for the onboard core crate.

use thiserror::Error;

/// Top-level error type for all onboard core operations.
#[derive(Debug, Error)]
pub enum OnboardError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("input is missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("input contains no records")]
    EmptyInput,

    #[error("unrecognized action: {0} (expected create, modify, delete or report)")]
    UnknownAction(String),

    #[error("directory error: {0}")]
    Directory(String),

    #[error("home directory error: {0}")]
    HomeDirectory(String),

    #[error("notification error: {0}")]
    Notification(String),
}

/// A convenience Result alias that defaults to [`OnboardError`].
pub type Result<T> = std::result::Result<T, OnboardError>;
