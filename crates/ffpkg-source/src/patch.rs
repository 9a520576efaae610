//! Exact-match text patches applied to the upstream build files.
//!
//! FFMS2's autotools setup generates `src/config/config.h` and force-includes
//! it into every translation unit. The recipe passes everything it needs on
//! the command line instead, so three lines are cut out of the build files.
//!
//! Every pattern must be present. A missing line means upstream changed and
//! the patch set is out of date; there is no fallback.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SourceError};

/// A single search-and-replace on one file, relative to the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub file: PathBuf,
    pub search: String,
    pub replace: String,
}

impl Patch {
    pub fn new(file: impl Into<PathBuf>, search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            search: search.into(),
            replace: replace.into(),
        }
    }

    /// Apply to in-memory file contents, replacing every occurrence.
    fn apply_to(&self, contents: &str, root: &Path) -> Result<String> {
        if !contents.contains(&self.search) {
            return Err(SourceError::Patch {
                file: root.join(&self.file),
                pattern: self.search.clone(),
            });
        }
        Ok(contents.replace(&self.search, &self.replace))
    }
}

/// An ordered list of patches applied as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    patches: Vec<Patch>,
}

impl PatchSet {
    pub fn new(patches: Vec<Patch>) -> Self {
        Self { patches }
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Apply every patch under `root`.
    ///
    /// All files are patched in memory first and written only once every
    /// pattern has matched, so a failing set leaves the tree untouched.
    pub fn apply(&self, root: &Path) -> Result<()> {
        let mut staged: BTreeMap<&Path, String> = BTreeMap::new();
        for patch in &self.patches {
            let current = match staged.remove(patch.file.as_path()) {
                Some(contents) => contents,
                None => std::fs::read_to_string(root.join(&patch.file))?,
            };
            let patched = patch.apply_to(&current, root)?;
            staged.insert(patch.file.as_path(), patched);
        }

        for (file, contents) in staged {
            debug!(file = %file.display(), "writing patched file");
            std::fs::write(root.join(file), contents)?;
        }
        Ok(())
    }
}

/// The patches FFMS2 needs to build without its generated config header.
pub fn ffms2_patches() -> PatchSet {
    PatchSet::new(vec![
        Patch::new("configure.ac", "AC_CONFIG_HEADERS([src/config/config.h])", ""),
        Patch::new("Makefile.am", "\t@ZLIB_CPPFLAGS@ \\", "\t@ZLIB_CPPFLAGS@"),
        Patch::new("Makefile.am", "\t-include config.h", ""),
    ])
}
