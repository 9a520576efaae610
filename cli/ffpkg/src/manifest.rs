//! `ffpkg.toml` manifest parsing and recipe configuration.
//!
//! Every section is optional; an empty manifest (or none at all) builds the
//! pinned FFMS2 recipe with its defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ffpkg_build::{DependencyInfo, RecipeConfig};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "ffpkg.toml";

/// The top-level manifest structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfpkgManifest {
    #[serde(default)]
    pub package: Option<PackageSection>,
    #[serde(default)]
    pub source: Option<SourceSection>,
    #[serde(default)]
    pub options: Option<OptionsSection>,
    #[serde(default)]
    pub dependency: Option<DependencySection>,
    #[serde(default)]
    pub paths: Option<PathsSection>,
}

/// Package metadata overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageSection {
    pub name: Option<String>,
    pub version: Option<String>,
    pub license: Option<String>,
    pub homepage: Option<String>,
}

/// Where the upstream source comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSection {
    pub url: Option<String>,
    pub revision: Option<String>,
    /// SHA-256 of the revision archive.
    pub sha256: Option<String>,
    pub license_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OptionsSection {
    #[serde(rename = "fPIC", alias = "fpic")]
    pub fpic: Option<bool>,
    pub build_triplet: Option<String>,
}

/// The FFmpeg install to build against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DependencySection {
    pub version: Option<String>,
    /// Install prefix with `include/` and `lib/` below it.
    pub prefix: Option<PathBuf>,
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    #[serde(default)]
    pub lib_paths: Vec<PathBuf>,
    #[serde(default)]
    pub libs: Vec<String>,
}

/// Working locations, relative to the manifest directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsSection {
    pub workdir: Option<PathBuf>,
    pub package: Option<PathBuf>,
    /// Default profile: a built-in name or a `.profile.toml` path.
    pub profile: Option<String>,
}

impl FfpkgManifest {
    /// Search upward from `start_dir` for an `ffpkg.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: FfpkgManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing ffpkg.toml")
    }

    /// The recipe with this manifest's overrides applied. Relative paths
    /// are resolved against `project_dir`.
    pub fn recipe(&self, project_dir: &Path) -> RecipeConfig {
        let mut recipe = RecipeConfig::default();

        if let Some(pkg) = &self.package {
            override_with(&mut recipe.name, &pkg.name);
            override_with(&mut recipe.version, &pkg.version);
            override_with(&mut recipe.license, &pkg.license);
            override_with(&mut recipe.homepage, &pkg.homepage);
        }
        if let Some(src) = &self.source {
            override_with(&mut recipe.source_url, &src.url);
            override_with(&mut recipe.revision, &src.revision);
            override_with(&mut recipe.license_file, &src.license_file);
            if src.sha256.is_some() {
                recipe.sha256 = src.sha256.clone();
            }
        }
        if let Some(opts) = &self.options {
            if let Some(fpic) = opts.fpic {
                recipe.options.fpic = fpic;
            }
            if opts.build_triplet.is_some() {
                recipe.options.build_triplet = opts.build_triplet.clone();
            }
        }
        if let Some(dep) = &self.dependency {
            recipe.dependency = dep.resolve(recipe.dependency, project_dir);
        }
        recipe
    }

    pub fn workdir(&self, project_dir: &Path) -> PathBuf {
        let rel = self.paths.as_ref().and_then(|p| p.workdir.clone());
        project_dir.join(rel.unwrap_or_else(|| PathBuf::from("build")))
    }

    pub fn package_dir(&self, project_dir: &Path) -> PathBuf {
        let rel = self.paths.as_ref().and_then(|p| p.package.clone());
        project_dir.join(rel.unwrap_or_else(|| PathBuf::from("package")))
    }

    pub fn default_profile(&self) -> Option<&str> {
        self.paths.as_ref().and_then(|p| p.profile.as_deref())
    }
}

impl DependencySection {
    fn resolve(&self, mut dep: DependencyInfo, project_dir: &Path) -> DependencyInfo {
        override_with(&mut dep.version, &self.version);
        if let Some(prefix) = &self.prefix {
            dep = dep.with_prefix(&project_dir.join(prefix));
        }
        if !self.include_paths.is_empty() {
            dep.include_paths = self.include_paths.iter().map(|p| project_dir.join(p)).collect();
        }
        if !self.lib_paths.is_empty() {
            dep.lib_paths = self.lib_paths.iter().map(|p| project_dir.join(p)).collect();
        }
        if !self.libs.is_empty() {
            dep.libs = self.libs.clone();
        }
        dep
    }
}

fn override_with(field: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        field.clone_from(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffpkg_build::recipe::FFMS2_COMMIT;

    #[test]
    fn parse_full_manifest() {
        let toml_str = r#"
[package]
name = "ffms2-core"
version = "2.31"

[source]
url = "https://github.com/FFMS/ffms2"
revision = "0123abcd"
sha256 = "ab12"

[options]
fPIC = false
build-triplet = "x86_64-pc-linux-gnu"

[dependency]
version = "4.2.1"
prefix = "deps/ffmpeg"

[paths]
workdir = "out/work"
package = "out/package"
profile = "windows-gcc-x86_64"
"#;
        let manifest = FfpkgManifest::from_str(toml_str).unwrap();
        let project = Path::new("/project");
        let recipe = manifest.recipe(project);

        assert_eq!(recipe.revision, "0123abcd");
        assert_eq!(recipe.sha256.as_deref(), Some("ab12"));
        assert!(!recipe.options.fpic);
        assert_eq!(recipe.options.build_triplet.as_deref(), Some("x86_64-pc-linux-gnu"));
        assert_eq!(recipe.dependency.version, "4.2.1");
        assert_eq!(
            recipe.dependency.lib_dir(),
            Some(Path::new("/project/deps/ffmpeg/lib"))
        );
        assert_eq!(manifest.workdir(project), Path::new("/project/out/work"));
        assert_eq!(manifest.package_dir(project), Path::new("/project/out/package"));
        assert_eq!(manifest.default_profile(), Some("windows-gcc-x86_64"));
    }

    #[test]
    fn empty_manifest_keeps_defaults() {
        let manifest = FfpkgManifest::from_str("").unwrap();
        let recipe = manifest.recipe(Path::new("/p"));
        assert_eq!(recipe, RecipeConfig::default());
        assert_eq!(recipe.revision, FFMS2_COMMIT);
        assert_eq!(manifest.workdir(Path::new("/p")), Path::new("/p/build"));
        assert_eq!(manifest.package_dir(Path::new("/p")), Path::new("/p/package"));
    }

    #[test]
    fn explicit_paths_override_prefix() {
        let manifest = FfpkgManifest::from_str(
            r#"
[dependency]
prefix = "/opt/ffmpeg"
include-paths = ["/usr/include/ffmpeg"]
libs = ["avcodec"]
"#,
        )
        .unwrap();
        let dep = manifest.recipe(Path::new("/p")).dependency;
        assert_eq!(dep.include_dir(), Some(Path::new("/usr/include/ffmpeg")));
        assert_eq!(dep.lib_dir(), Some(Path::new("/opt/ffmpeg/lib")));
        assert_eq!(dep.libs, vec!["avcodec"]);
    }

    #[test]
    fn reject_invalid_toml() {
        assert!(FfpkgManifest::from_str("this is not valid toml [[[").is_err());
        assert!(FfpkgManifest::from_str("[options]\nfPIC = \"yes\"\n").is_err());
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            "[package]\nname = \"parent\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found_dir) = FfpkgManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.recipe(&found_dir).name, "parent");
        assert_eq!(found_dir, dir.path());
    }

    #[test]
    fn find_and_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "[[[").unwrap();
        let err = FfpkgManifest::find_and_load(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }
}
