//! Source acquisition error types.

use std::path::PathBuf;

/// Errors that can occur while preparing the source tree.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The archive could not be downloaded or located.
    #[error("failed to fetch {url}: {detail}")]
    Fetch { url: String, detail: String },

    /// The downloaded archive does not match its pinned digest.
    #[error("integrity check failed for {url}: expected {expected}, got {actual}")]
    Integrity {
        url: String,
        expected: String,
        actual: String,
    },

    /// The archive could not be unpacked, or unpacked to an unexpected layout.
    #[error("failed to extract {}: {detail}", archive.display())]
    Extract { archive: PathBuf, detail: String },

    /// An expected line is missing from an upstream file.
    #[error("patch failed: '{pattern}' not found in {}", file.display())]
    Patch { file: PathBuf, pattern: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
