//! Error types for Kangui.
//!
//! [`KanguiError`] covers configuration, filesystem and client-construction
//! problems. Failures of the two API stages are not errors in this sense; they
//! are reported as [`crate::failure::Failure`] values.

use thiserror::Error;

/// Library-level error type for Kangui operations.
#[derive(Error, Debug)]
pub enum KanguiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unsupported audio file: {0}")]
    UnsupportedAudio(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl KanguiError {
    /// Short variant name, safe to show to users without leaking details.
    pub fn category(&self) -> &'static str {
        match self {
            KanguiError::Config(_) => "Config",
            KanguiError::Io(_) => "Io",
            KanguiError::TomlParse(_) => "TomlParse",
            KanguiError::Http(_) => "Http",
            KanguiError::UnsupportedAudio(_) => "UnsupportedAudio",
            KanguiError::InvalidInput(_) => "InvalidInput",
        }
    }
}

/// Result type alias for Kangui operations.
pub type Result<T> = std::result::Result<T, KanguiError>;
