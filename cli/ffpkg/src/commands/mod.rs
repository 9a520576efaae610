//! CLI command implementations.

pub mod build;
pub mod clean;
pub mod doctor;
pub mod plan;
pub mod profile;
pub mod source;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use ffpkg_platform::profile::{builtin_profile, discover_profiles};
use ffpkg_platform::{load_profile, validate_descriptor, PlatformDescriptor};
use tracing::warn;

use crate::manifest::FfpkgManifest;

/// Target selection flags. Individual settings override the profile.
#[derive(Args, Default)]
pub struct TargetArgs {
    /// Built-in profile name, project profile name, or .profile.toml path
    #[arg(long)]
    pub profile: Option<String>,
    /// Target OS (linux, windows, macos, freebsd, android)
    #[arg(long)]
    pub os: Option<String>,
    /// Compiler family (gcc, clang, apple-clang, msvc)
    #[arg(long)]
    pub compiler: Option<String>,
    /// Target architecture (x86, x86_64, armv7, armv8)
    #[arg(long)]
    pub arch: Option<String>,
    /// Build type (Debug, Release, RelWithDebInfo, MinSizeRel)
    #[arg(long)]
    pub build_type: Option<String>,
}

/// Where the upstream source comes from.
#[derive(Args, Default)]
pub struct SourceArgs {
    /// Use an already unpacked upstream tree instead of downloading
    #[arg(long)]
    pub source_dir: Option<PathBuf>,
    /// Keep the downloaded archive in the working directory
    #[arg(long)]
    pub keep_archive: bool,
}

/// Resolved working locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    pub workdir: PathBuf,
    pub package_dir: PathBuf,
}

/// Find a profile by name: a file path, then `profiles/<name>.profile.toml`
/// in the project, then the built-in table.
pub fn resolve_profile(name: &str, project_dir: &Path) -> Result<PlatformDescriptor> {
    let as_path = project_dir.join(name);
    if name.ends_with(".toml") || as_path.is_file() {
        return load_profile(&as_path).with_context(|| format!("loading profile {}", as_path.display()));
    }

    if let Some((_, path)) = discover_profiles(project_dir)?
        .into_iter()
        .find(|(profile, _)| profile == name)
    {
        return load_profile(&path).with_context(|| format!("loading profile {}", path.display()));
    }

    match builtin_profile(name) {
        Some(descriptor) => Ok(descriptor),
        None => bail!("unknown profile: '{name}'. Use 'ffpkg profile list' to see available profiles."),
    }
}

/// Build the target descriptor from flags, the manifest's default profile,
/// or the native platform, in that order. Validation errors stop here;
/// warnings are logged.
pub fn resolve_descriptor(
    args: &TargetArgs,
    project_dir: &Path,
    manifest: &FfpkgManifest,
) -> Result<PlatformDescriptor> {
    let mut descriptor = match args.profile.as_deref().or(manifest.default_profile()) {
        Some(name) => resolve_profile(name, project_dir)?,
        None => PlatformDescriptor::native(),
    };

    if let Some(os) = &args.os {
        descriptor.os = os.parse()?;
    }
    if let Some(compiler) = &args.compiler {
        descriptor.compiler = compiler.parse()?;
    }
    if let Some(arch) = &args.arch {
        descriptor.arch = arch.parse()?;
    }
    if let Some(build_type) = &args.build_type {
        descriptor.build_type = build_type.parse()?;
    }

    if let Err(issues) = validate_descriptor(&descriptor) {
        let mut errors = Vec::new();
        for issue in issues {
            if issue.is_error() {
                errors.push(issue.message);
            } else {
                warn!(target_platform = %descriptor.name(), "{}", issue.message);
            }
        }
        if !errors.is_empty() {
            bail!("invalid target {}: {}", descriptor.name(), errors.join("; "));
        }
    }
    Ok(descriptor)
}
