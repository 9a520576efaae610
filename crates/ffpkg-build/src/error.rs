//! Build pipeline errors.

use std::fmt;
use std::path::PathBuf;

use ffpkg_platform::PlatformError;
use ffpkg_source::SourceError;
use thiserror::Error;

use crate::orchestrator::Stage;

/// Errors that can occur while building and packaging.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Fetching, extracting or patching the source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Loading or validating the platform descriptor failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// An external tool ran but exited unsuccessfully.
    #[error("{tool} exited with {status}\n{output}")]
    ToolFailed {
        /// Program name, e.g. "make".
        tool: String,
        /// Exit status description.
        status: String,
        /// Last lines of the tool's output.
        output: String,
    },

    /// An external tool could not be started at all.
    #[error("could not launch {tool}: {source}")]
    ToolLaunch {
        /// Program name.
        tool: String,
        /// The spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The installed tree does not make a complete package.
    #[error("packaging failed at {}: {detail}", path.display())]
    Packaging {
        /// File or directory the problem was found at.
        path: PathBuf,
        /// What is missing or wrong.
        detail: String,
    },

    /// The dependency lacks an include or lib directory.
    #[error("dependency '{name}' has no {kind} path")]
    MissingDependency {
        /// Dependency name (e.g. "ffmpeg").
        name: String,
        /// "include" or "lib".
        kind: &'static str,
    },

    /// A stage was requested out of order.
    #[error("cannot {operation} while {stage}")]
    InvalidTransition {
        /// The requested operation.
        operation: &'static str,
        /// The stage the orchestrator was in.
        stage: Stage,
    },

    /// Package metadata (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error in the work or package directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// The category a failed pipeline reports.
    pub fn kind(&self) -> FailureKind {
        match self {
            BuildError::Source(SourceError::Fetch { .. })
            | BuildError::Source(SourceError::Integrity { .. })
            | BuildError::Source(SourceError::Extract { .. }) => FailureKind::Fetch,
            BuildError::Source(SourceError::Patch { .. }) => FailureKind::Patch,
            BuildError::Source(SourceError::Io(_)) | BuildError::Io(_) | BuildError::Json(_) => {
                FailureKind::Io
            }
            BuildError::ToolFailed { .. } | BuildError::ToolLaunch { .. } => FailureKind::Build,
            BuildError::Packaging { .. } => FailureKind::Packaging,
            BuildError::MissingDependency { .. } | BuildError::Platform(_) => {
                FailureKind::Configuration
            }
            BuildError::InvalidTransition { .. } => FailureKind::Usage,
        }
    }
}

/// Error category carried by a failed pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Fetch,
    Patch,
    Configuration,
    Build,
    Packaging,
    Io,
    Usage,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Fetch => "fetch error",
            FailureKind::Patch => "patch error",
            FailureKind::Configuration => "configuration error",
            FailureKind::Build => "build error",
            FailureKind::Packaging => "packaging error",
            FailureKind::Io => "I/O error",
            FailureKind::Usage => "usage error",
        };
        f.write_str(name)
    }
}

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_map_to_kinds() {
        let fetch = BuildError::from(SourceError::Fetch {
            url: "https://example.invalid/a.tar.gz".into(),
            detail: "404".into(),
        });
        assert_eq!(fetch.kind(), FailureKind::Fetch);

        let patch = BuildError::from(SourceError::Patch {
            file: "Makefile.am".into(),
            pattern: "\t-include config.h".into(),
        });
        assert_eq!(patch.kind(), FailureKind::Patch);
        assert!(patch.to_string().contains("Makefile.am"));
    }

    #[test]
    fn tool_failure_message_carries_output() {
        let err = BuildError::ToolFailed {
            tool: "make".into(),
            status: "exit status: 2".into(),
            output: "src/core/track.cpp:1: error".into(),
        };
        assert_eq!(err.kind(), FailureKind::Build);
        let msg = err.to_string();
        assert!(msg.starts_with("make exited with exit status: 2"));
        assert!(msg.contains("track.cpp"));
    }
}
