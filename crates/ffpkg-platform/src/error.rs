//! Error types for platform descriptor operations.

use std::path::PathBuf;

/// Errors that can occur while building or loading a platform descriptor.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error reading/writing profile files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Profile file not found.
    #[error("profile not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// A setting value that does not name a known variant.
    #[error("unknown {setting} '{value}' (expected one of: {expected})")]
    Unknown {
        /// Setting name (e.g. "compiler").
        setting: &'static str,
        /// The rejected value.
        value: String,
        /// Comma-separated list of accepted values.
        expected: &'static str,
    },
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
