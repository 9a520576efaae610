//! Package assembly.
//!
//! After `make install` / `cmake --install` the package directory holds the
//! installed headers and libraries. This module adds the license, the DLLs
//! of a native build, removes libtool archives, and records the libraries a
//! consumer should link in `package.json`.

use std::path::{Path, PathBuf};

use ffpkg_source::fs::{find_files, has_extension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cmake;
use crate::config::BuildConfiguration;
use crate::error::{BuildError, Result};
use crate::orchestrator::BuildArtifacts;
use crate::recipe::RecipeConfig;
use crate::strategy::BuildStrategy;
use crate::toolchain::CommandRunner;

/// Metadata file written at the package root.
pub const PACKAGE_INFO_FILE: &str = "package.json";

/// Library file extensions picked up by [`collect_libs`].
const LIB_EXTENSIONS: &[&str] = &["so", "lib", "a", "dylib"];

/// Consumer-facing package metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    /// Link names, without `lib` prefix or extension.
    pub libs: Vec<String>,
    /// Directories relative to the package root.
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub bin_dirs: Vec<String>,
}

/// The assembled package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    pub root: PathBuf,
    pub licenses_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub lib_dir: PathBuf,
    pub include_dir: PathBuf,
    pub info: PackageInfo,
}

impl PackageLayout {
    pub fn info_path(&self) -> PathBuf {
        self.root.join(PACKAGE_INFO_FILE)
    }

    /// Read back a previously assembled package.
    pub fn load(root: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(root.join(PACKAGE_INFO_FILE))?;
        let info: PackageInfo = serde_json::from_str(&text)?;
        Ok(Self::with_info(root, info))
    }

    fn with_info(root: &Path, info: PackageInfo) -> Self {
        Self {
            root: root.to_path_buf(),
            licenses_dir: root.join("licenses"),
            bin_dir: root.join("bin"),
            lib_dir: root.join("lib"),
            include_dir: root.join("include"),
            info,
        }
    }
}

/// Link names of the libraries in `lib_dir`, sorted.
///
/// `libffms2.a` and `libffms2.so` become `ffms2`; `.lib` files keep their
/// stem unchanged, since MSVC import libraries carry no `lib` prefix
/// convention.
pub fn collect_libs(lib_dir: &Path) -> Result<Vec<String>> {
    let mut libs = Vec::new();
    if !lib_dir.is_dir() {
        return Ok(libs);
    }
    for entry in std::fs::read_dir(lib_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let (Some(file_name), Some(stem)) = (
            path.file_name().and_then(|s| s.to_str()),
            path.file_stem().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        if !LIB_EXTENSIONS.iter().any(|ext| has_extension(file_name, ext)) {
            continue;
        }
        let name = match stem.strip_prefix("lib") {
            Some(rest) if !has_extension(file_name, "lib") && !rest.is_empty() => rest,
            _ => stem,
        };
        libs.push(name.to_string());
    }
    libs.sort();
    libs.dedup();
    Ok(libs)
}

/// Copy the license, finish the install, clean up and write `package.json`.
///
/// `package.json` is written last; its presence marks a complete package.
pub fn assemble_package(
    runner: &dyn CommandRunner,
    artifacts: &BuildArtifacts,
    recipe: &RecipeConfig,
    config: &BuildConfiguration,
) -> Result<PackageLayout> {
    let root = &artifacts.package_dir;
    std::fs::create_dir_all(root)?;
    let mut layout = PackageLayout::with_info(
        root,
        PackageInfo {
            name: recipe.name.clone(),
            version: recipe.version.clone(),
            libs: Vec::new(),
            include_dirs: vec!["include".into()],
            lib_dirs: vec!["lib".into()],
            bin_dirs: Vec::new(),
        },
    );

    copy_license(&artifacts.source_root, &recipe.license_file, &layout.licenses_dir)?;

    match artifacts.strategy {
        BuildStrategy::NativeBuildSystem => {
            let copied = copy_flat(&artifacts.build_dir, "dll", &layout.bin_dir)?;
            debug!(count = copied, "copied dlls");
            runner.run(&cmake::install_step(config, &artifacts.build_dir))?;
        }
        BuildStrategy::Autotools => {
            // libtool archives hard-code the build prefix
            for la in find_files(&layout.lib_dir, &|name| has_extension(name, "la"))? {
                debug!(file = %la.display(), "removing libtool archive");
                std::fs::remove_file(la)?;
            }
        }
    }

    if layout.bin_dir.is_dir() {
        layout.info.bin_dirs.push("bin".into());
    }
    layout.info.libs = collect_libs(&layout.lib_dir)?;
    if layout.info.libs.is_empty() {
        return Err(BuildError::Packaging {
            path: layout.lib_dir.clone(),
            detail: "no libraries were installed".into(),
        });
    }

    let json = serde_json::to_string_pretty(&layout.info)?;
    std::fs::write(layout.info_path(), json)?;
    info!(package = %root.display(), libs = ?layout.info.libs, "package assembled");
    Ok(layout)
}

/// Copy the license file, matched case-insensitively anywhere under
/// `source_root`, into `licenses_dir` without its directory structure.
fn copy_license(source_root: &Path, license_file: &str, licenses_dir: &Path) -> Result<()> {
    let found = find_files(source_root, &|name| name.eq_ignore_ascii_case(license_file))?;
    if found.is_empty() {
        return Err(BuildError::Packaging {
            path: source_root.join(license_file),
            detail: "license file not found in source tree".into(),
        });
    }
    std::fs::create_dir_all(licenses_dir)?;
    for path in found {
        if let Some(name) = path.file_name() {
            std::fs::copy(&path, licenses_dir.join(name))?;
        }
    }
    Ok(())
}

/// Copy every `*.ext` under `from` into `to`, flattened. Returns the count.
fn copy_flat(from: &Path, ext: &str, to: &Path) -> Result<usize> {
    let files = find_files(from, &|name| has_extension(name, ext))?;
    if files.is_empty() {
        return Ok(0);
    }
    std::fs::create_dir_all(to)?;
    for path in &files {
        if let Some(name) = path.file_name() {
            std::fs::copy(path, to.join(name))?;
        }
    }
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildTriplet;
    use crate::toolchain::{ToolInvocation, ToolOutput};
    use ffpkg_platform::BuildType;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    /// Records invocations; `cmake --install` drops a library into the
    /// package the way a real install would.
    struct Installer {
        package: PathBuf,
        calls: RefCell<Vec<String>>,
    }

    impl CommandRunner for Installer {
        fn execute(&self, inv: &ToolInvocation) -> Result<ToolOutput> {
            self.calls.borrow_mut().push(inv.command_line());
            if inv.args.first().map(String::as_str) == Some("--install") {
                touch(&self.package.join("lib/ffms2.lib"));
                touch(&self.package.join("include/ffms.h"));
            }
            Ok(ToolOutput::success())
        }
    }

    fn config(prefix: &Path) -> BuildConfiguration {
        BuildConfiguration {
            prefix: prefix.display().to_string(),
            static_only: true,
            host_triplet: None,
            build_triplet: BuildTriplet::Detect,
            fpic: Some(true),
            build_type: BuildType::Release,
            win_bash: false,
            extra_env: BTreeMap::new(),
            jobs: 2,
        }
    }

    fn artifacts(dir: &Path, strategy: BuildStrategy) -> BuildArtifacts {
        let source_root = dir.join("source_subfolder");
        touch(&source_root.join("COPYING.LIB"));
        BuildArtifacts {
            strategy,
            source_root,
            build_dir: dir.join("build_subfolder"),
            package_dir: dir.join("package"),
        }
    }

    #[test]
    fn collect_libs_naming() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["libffms2.a", "ffms2.lib", "libavutil.so", "libfoo.dylib", "libffms2.la", "README", "lib.a"] {
            touch(&dir.path().join(name));
        }
        assert_eq!(
            collect_libs(dir.path()).unwrap(),
            vec!["avutil", "ffms2", "foo", "lib"]
        );
    }

    #[test]
    fn collect_libs_keeps_lib_prefix_on_import_libs() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("libffms2.lib"));
        assert_eq!(collect_libs(dir.path()).unwrap(), vec!["libffms2"]);
    }

    #[test]
    fn collect_libs_ignores_extension_case() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("FFMS2.LIB"));
        touch(&dir.path().join("libavcodec.A"));
        assert_eq!(collect_libs(dir.path()).unwrap(), vec!["FFMS2", "avcodec"]);
    }

    #[test]
    fn autotools_package_drops_la_files() {
        let dir = tempfile::tempdir().unwrap();
        let arts = artifacts(dir.path(), BuildStrategy::Autotools);
        touch(&arts.package_dir.join("lib/libffms2.a"));
        touch(&arts.package_dir.join("lib/libffms2.la"));
        touch(&arts.package_dir.join("include/ffms.h"));
        let runner = Installer {
            package: arts.package_dir.clone(),
            calls: RefCell::default(),
        };

        let layout =
            assemble_package(&runner, &arts, &RecipeConfig::default(), &config(&arts.package_dir)).unwrap();

        assert!(!layout.lib_dir.join("libffms2.la").exists());
        assert!(layout.licenses_dir.join("COPYING.LIB").is_file());
        assert_eq!(layout.info.libs, vec!["ffms2"]);
        assert!(layout.info.bin_dirs.is_empty());
        assert!(runner.calls.borrow().is_empty());

        let loaded = PackageLayout::load(&arts.package_dir).unwrap();
        assert_eq!(loaded.info, layout.info);
    }

    #[test]
    fn native_package_copies_dlls_and_installs() {
        let dir = tempfile::tempdir().unwrap();
        let arts = artifacts(dir.path(), BuildStrategy::NativeBuildSystem);
        touch(&arts.build_dir.join("Release/ffms2.dll"));
        let runner = Installer {
            package: arts.package_dir.clone(),
            calls: RefCell::default(),
        };

        let layout =
            assemble_package(&runner, &arts, &RecipeConfig::default(), &config(&arts.package_dir)).unwrap();

        assert!(layout.bin_dir.join("ffms2.dll").is_file());
        assert_eq!(layout.info.libs, vec!["ffms2"]);
        assert_eq!(layout.info.bin_dirs, vec!["bin"]);
        assert!(runner.calls.borrow()[0].starts_with("cmake --install"));
    }

    #[test]
    fn license_match_ignores_case_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let arts = artifacts(dir.path(), BuildStrategy::Autotools);
        std::fs::remove_file(arts.source_root.join("COPYING.LIB")).unwrap();
        touch(&arts.source_root.join("doc/copying.lib"));
        touch(&arts.package_dir.join("lib/libffms2.a"));
        let runner = Installer {
            package: arts.package_dir.clone(),
            calls: RefCell::default(),
        };

        assemble_package(&runner, &arts, &RecipeConfig::default(), &config(&arts.package_dir)).unwrap();
        assert!(arts.package_dir.join("licenses/copying.lib").is_file());
    }

    #[test]
    fn missing_license_is_packaging_error() {
        let dir = tempfile::tempdir().unwrap();
        let arts = artifacts(dir.path(), BuildStrategy::Autotools);
        std::fs::remove_file(arts.source_root.join("COPYING.LIB")).unwrap();
        touch(&arts.package_dir.join("lib/libffms2.a"));
        let runner = Installer {
            package: arts.package_dir.clone(),
            calls: RefCell::default(),
        };

        let err = assemble_package(&runner, &arts, &RecipeConfig::default(), &config(&arts.package_dir))
            .unwrap_err();
        assert!(matches!(err, BuildError::Packaging { .. }));
        assert!(!arts.package_dir.join(PACKAGE_INFO_FILE).exists());
    }

    #[test]
    fn empty_lib_dir_is_packaging_error() {
        let dir = tempfile::tempdir().unwrap();
        let arts = artifacts(dir.path(), BuildStrategy::Autotools);
        let runner = Installer {
            package: arts.package_dir.clone(),
            calls: RefCell::default(),
        };
        let err = assemble_package(&runner, &arts, &RecipeConfig::default(), &config(&arts.package_dir))
            .unwrap_err();
        assert!(matches!(err, BuildError::Packaging { .. }));
    }
}
