//! The prepared source tree.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::fetch::{SourceFetcher, SourceSpec};
use crate::patch::PatchSet;

/// Fixed name the extracted source directory is renamed to.
pub const SOURCE_SUBFOLDER: &str = "source_subfolder";

/// A recipe-provided file copied into the source root before patching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Path relative to the source root.
    pub path: PathBuf,
    pub contents: String,
}

impl ExportedFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Fetched, renamed and patched upstream source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    root: PathBuf,
    revision: String,
}

impl SourceTree {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Path of a file inside the tree.
    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }
}

/// Fetch the source into `workdir`, rename it to [`SOURCE_SUBFOLDER`], copy
/// the exported files in and apply `patches`.
///
/// A stale `source_subfolder` from an earlier run is removed first; each
/// build starts from a fresh tree.
pub fn prepare_source(
    fetcher: &dyn SourceFetcher,
    spec: &SourceSpec,
    workdir: &Path,
    exports: &[ExportedFile],
    patches: &PatchSet,
) -> Result<SourceTree> {
    std::fs::create_dir_all(workdir)?;
    let extracted = fetcher.fetch(spec, workdir)?;

    let root = workdir.join(SOURCE_SUBFOLDER);
    if root.exists() {
        std::fs::remove_dir_all(&root)?;
    }
    std::fs::rename(&extracted, &root)?;

    for file in exports {
        let dest = root.join(&file.path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, &file.contents)?;
    }

    patches.apply(&root)?;
    info!(
        root = %root.display(),
        revision = %spec.revision,
        patches = patches.len(),
        "source prepared"
    );

    Ok(SourceTree {
        root,
        revision: spec.revision.clone(),
    })
}
