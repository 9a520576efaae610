//! Recipe-wide settings.
//!
//! One immutable `RecipeConfig` is built up front (from defaults, the
//! manifest and CLI flags) and passed by reference to every stage.

use std::path::{Path, PathBuf};

use ffpkg_source::SourceSpec;

/// Upstream repository of the packaged library.
pub const FFMS2_URL: &str = "https://github.com/FFMS/ffms2";

/// Pinned upstream commit. The 2.31 release tarball does not build, so the
/// recipe tracks an unreleased commit.
pub const FFMS2_COMMIT: &str = "a9e8f7397aeb341537743dea601cd7f7fe6b93ff";

/// License file shipped in the upstream tree.
pub const FFMS2_LICENSE_FILE: &str = "COPYING.LIB";

/// Options a consumer may toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeOptions {
    /// Build position-independent code. Ignored for Windows targets.
    pub fpic: bool,
    /// Explicit `--build` triplet for configure, when the host triplet
    /// guess is wrong. Never passed for MinGW targets.
    pub build_triplet: Option<String>,
}

impl Default for RecipeOptions {
    fn default() -> Self {
        Self {
            fpic: true,
            build_triplet: None,
        }
    }
}

/// Include/lib locations of an installed dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    pub name: String,
    pub version: String,
    pub include_paths: Vec<PathBuf>,
    pub lib_paths: Vec<PathBuf>,
    /// Library names to link, without `lib` prefix or extension.
    pub libs: Vec<String>,
}

impl DependencyInfo {
    /// The FFmpeg dependency with no install location yet.
    pub fn ffmpeg() -> Self {
        Self {
            name: "ffmpeg".into(),
            version: "4.2".into(),
            include_paths: Vec::new(),
            lib_paths: Vec::new(),
            libs: ["avformat", "avcodec", "swscale", "swresample", "avutil"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// Point the dependency at a conventional `<prefix>/{include,lib}` install.
    pub fn with_prefix(mut self, prefix: &Path) -> Self {
        self.include_paths = vec![prefix.join("include")];
        self.lib_paths = vec![prefix.join("lib")];
        self
    }

    pub fn include_dir(&self) -> Option<&Path> {
        self.include_paths.first().map(PathBuf::as_path)
    }

    pub fn lib_dir(&self) -> Option<&Path> {
        self.lib_paths.first().map(PathBuf::as_path)
    }
}

/// Everything the recipe knows about the package it builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeConfig {
    pub name: String,
    pub version: String,
    pub license: String,
    pub homepage: String,
    /// Upstream repository URL.
    pub source_url: String,
    /// Upstream revision (commit or tag).
    pub revision: String,
    /// Optional pinned archive digest.
    pub sha256: Option<String>,
    /// License file to ship, matched case-insensitively in the source tree.
    pub license_file: String,
    pub options: RecipeOptions,
    pub dependency: DependencyInfo,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            name: "ffms2-core".into(),
            version: "2.31".into(),
            license: "MIT".into(),
            homepage: FFMS2_URL.into(),
            source_url: FFMS2_URL.into(),
            revision: FFMS2_COMMIT.into(),
            sha256: None,
            license_file: FFMS2_LICENSE_FILE.into(),
            options: RecipeOptions::default(),
            dependency: DependencyInfo::ffmpeg(),
        }
    }
}

impl RecipeConfig {
    pub fn source_spec(&self) -> SourceSpec {
        let spec = SourceSpec::new(self.source_url.clone(), self.revision.clone());
        match &self.sha256 {
            Some(digest) => spec.with_sha256(digest.clone()),
            None => spec,
        }
    }

    /// `name/version` reference used in logs and reports.
    pub fn reference(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pin_ffms2() {
        let recipe = RecipeConfig::default();
        assert_eq!(recipe.reference(), "ffms2-core/2.31");
        let spec = recipe.source_spec();
        assert_eq!(spec.extracted_dir(), format!("ffms2-{FFMS2_COMMIT}"));
        assert!(spec.sha256.is_none());
        assert!(recipe.options.fpic);
    }

    #[test]
    fn dependency_prefix_layout() {
        let dep = DependencyInfo::ffmpeg().with_prefix(Path::new("/opt/ffmpeg"));
        assert_eq!(dep.include_dir(), Some(Path::new("/opt/ffmpeg/include")));
        assert_eq!(dep.lib_dir(), Some(Path::new("/opt/ffmpeg/lib")));
        assert!(dep.libs.contains(&"avcodec".to_string()));
    }

    #[test]
    fn pinned_digest_flows_into_spec() {
        let recipe = RecipeConfig {
            sha256: Some("abc".into()),
            ..RecipeConfig::default()
        };
        assert_eq!(recipe.source_spec().sha256.as_deref(), Some("abc"));
    }
}
