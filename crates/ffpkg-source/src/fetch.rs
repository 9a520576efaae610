//! Archive fetching.
//!
//! The `SourceFetcher` trait abstracts over where the upstream source comes
//! from. `ArchiveFetcher` downloads a commit tarball with `curl` and unpacks
//! it with `tar`; `LocalTreeFetcher` copies an already-unpacked tree, for
//! offline builds and tests.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::fs::copy_dir_all;
use crate::integrity::ContentHash;

/// Where the upstream source lives and which revision to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Repository URL, e.g. `https://github.com/FFMS/ffms2`.
    pub base_url: String,
    /// Commit or tag to fetch.
    pub revision: String,
    /// Optional pinned SHA-256 of the archive.
    pub sha256: Option<String>,
}

impl SourceSpec {
    pub fn new(base_url: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            revision: revision.into(),
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// Project name: the last path segment of the repository URL.
    pub fn project_name(&self) -> &str {
        self.base_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.base_url)
    }

    /// URL of the `.tar.gz` archive for the pinned revision.
    pub fn archive_url(&self) -> String {
        format!(
            "{}/archive/{}.tar.gz",
            self.base_url.trim_end_matches('/'),
            self.revision
        )
    }

    /// Name of the directory the archive unpacks to.
    pub fn extracted_dir(&self) -> String {
        format!("{}-{}", self.project_name(), self.revision)
    }
}

/// Abstract source backend.
pub trait SourceFetcher {
    /// Make the unpacked source available as `<workdir>/<spec.extracted_dir()>`
    /// and return that path.
    fn fetch(&self, spec: &SourceSpec, workdir: &Path) -> Result<PathBuf>;
}

/// Downloads the commit archive and unpacks it.
///
/// `file://` URLs and plain paths are copied instead of downloaded.
#[derive(Debug, Clone, Default)]
pub struct ArchiveFetcher {
    /// Keep the downloaded archive next to the unpacked tree.
    pub keep_archive: bool,
}

impl ArchiveFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(local) = local_path(url) {
            if !local.is_file() {
                return Err(SourceError::Fetch {
                    url: url.to_string(),
                    detail: "no such file".into(),
                });
            }
            std::fs::copy(&local, dest)?;
            return Ok(());
        }

        info!(url, "downloading source archive");
        let output = Command::new("curl")
            .args(["--fail", "--location", "--silent", "--show-error", "-o"])
            .arg(dest)
            .arg(url)
            .output()
            .map_err(|e| SourceError::Fetch {
                url: url.to_string(),
                detail: format!("could not run curl: {e}"),
            })?;

        if !output.status.success() {
            let _ = std::fs::remove_file(dest);
            return Err(SourceError::Fetch {
                url: url.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn extract(&self, archive: &Path, workdir: &Path) -> Result<()> {
        debug!(archive = %archive.display(), "extracting");
        let output = Command::new("tar")
            .arg("-xzf")
            .arg(archive)
            .arg("-C")
            .arg(workdir)
            .output()
            .map_err(|e| SourceError::Extract {
                archive: archive.to_path_buf(),
                detail: format!("could not run tar: {e}"),
            })?;

        if !output.status.success() {
            return Err(SourceError::Extract {
                archive: archive.to_path_buf(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl SourceFetcher for ArchiveFetcher {
    fn fetch(&self, spec: &SourceSpec, workdir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(workdir)?;
        let url = spec.archive_url();
        let archive = workdir.join(format!("{}.tar.gz", spec.revision));

        self.download(&url, &archive)?;

        if let Some(expected) = &spec.sha256 {
            let expected = ContentHash::from_hex(expected);
            let actual = ContentHash::compute_file(&archive)?;
            if actual != expected {
                let _ = std::fs::remove_file(&archive);
                return Err(SourceError::Integrity {
                    url,
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        self.extract(&archive, workdir)?;
        if !self.keep_archive {
            std::fs::remove_file(&archive)?;
        }

        let extracted = workdir.join(spec.extracted_dir());
        if !extracted.is_dir() {
            return Err(SourceError::Extract {
                archive,
                detail: format!("expected top-level directory {}", spec.extracted_dir()),
            });
        }
        Ok(extracted)
    }
}

/// Copies an already-unpacked source tree.
#[derive(Debug, Clone)]
pub struct LocalTreeFetcher {
    root: PathBuf,
}

impl LocalTreeFetcher {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceFetcher for LocalTreeFetcher {
    fn fetch(&self, spec: &SourceSpec, workdir: &Path) -> Result<PathBuf> {
        if !self.root.is_dir() {
            return Err(SourceError::Fetch {
                url: self.root.display().to_string(),
                detail: "source directory does not exist".into(),
            });
        }
        let extracted = workdir.join(spec.extracted_dir());
        if extracted.exists() {
            std::fs::remove_dir_all(&extracted)?;
        }
        info!(from = %self.root.display(), "copying local source tree");
        copy_dir_all(&self.root, &extracted)?;
        Ok(extracted)
    }
}

/// Map `file://` URLs and bare paths to a filesystem path.
fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if url.contains("://") {
        return None;
    }
    Some(PathBuf::from(url))
}
