//! TOML profiles, validation, and discovery for platform descriptors.
//!
//! A profile is a `.profile.toml` file holding one `PlatformDescriptor`.
//! Profiles live in the `profiles/` directory next to `ffpkg.toml`; a few
//! common ones are built in.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::descriptor::{Arch, CompilerFamily, OperatingSystem, PlatformDescriptor};
use crate::error::{PlatformError, Result};
use crate::host::BuildHost;

/// A validation issue found in a platform descriptor.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: "error",
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: "warning",
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == "error"
    }
}

/// Load a descriptor from a `.profile.toml` file.
pub fn load_profile(path: &Path) -> Result<PlatformDescriptor> {
    if !path.exists() {
        return Err(PlatformError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), "loading platform profile");
    parse_profile(&content)
}

/// Parse a descriptor from a TOML string.
pub fn parse_profile(toml_str: &str) -> Result<PlatformDescriptor> {
    let descriptor: PlatformDescriptor = toml::from_str(toml_str)?;
    Ok(descriptor)
}

/// Serialize a descriptor to pretty TOML.
pub fn profile_to_toml(descriptor: &PlatformDescriptor) -> Result<String> {
    let toml_str = toml::to_string_pretty(descriptor)?;
    Ok(toml_str)
}

/// Validate that a descriptor names a buildable combination.
///
/// Returns `Ok(())` if there is nothing to report, or `Err(issues)` with a
/// list of problems. Only issues with severity "error" should stop a build.
pub fn validate_descriptor(
    descriptor: &PlatformDescriptor,
) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if descriptor.is_msvc() && descriptor.os != OperatingSystem::Windows {
        issues.push(ValidationIssue::error(format!(
            "compiler msvc cannot target {}",
            descriptor.os
        )));
    }

    if descriptor.compiler == CompilerFamily::AppleClang && descriptor.os != OperatingSystem::Macos {
        issues.push(ValidationIssue::error(format!(
            "compiler apple-clang cannot target {}",
            descriptor.os
        )));
    }

    if descriptor.targets_mingw() && descriptor.arch.mingw_triplet().is_none() {
        issues.push(ValidationIssue::error(format!(
            "no MinGW toolchain triplet is known for arch {}",
            descriptor.arch
        )));
    }

    if descriptor.is_msvc() && !descriptor.host.is_windows() {
        issues.push(ValidationIssue::warning(format!(
            "msvc builds need a Windows host, but this host is {}",
            descriptor.host.os
        )));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Resolve a built-in profile name to a descriptor on the current host.
pub fn builtin_profile(name: &str) -> Option<PlatformDescriptor> {
    let (os, compiler, arch) = match name {
        "linux-gcc-x86_64" => (OperatingSystem::Linux, CompilerFamily::Gcc, Arch::X86_64),
        "linux-clang-x86_64" => (OperatingSystem::Linux, CompilerFamily::Clang, Arch::X86_64),
        "linux-gcc-armv8" => (OperatingSystem::Linux, CompilerFamily::Gcc, Arch::Armv8),
        "macos-apple-clang-armv8" => (OperatingSystem::Macos, CompilerFamily::AppleClang, Arch::Armv8),
        "windows-msvc-x86_64" => (OperatingSystem::Windows, CompilerFamily::Msvc, Arch::X86_64),
        "windows-msvc-x86" => (OperatingSystem::Windows, CompilerFamily::Msvc, Arch::X86),
        "windows-gcc-x86_64" => (OperatingSystem::Windows, CompilerFamily::Gcc, Arch::X86_64),
        "windows-gcc-x86" => (OperatingSystem::Windows, CompilerFamily::Gcc, Arch::X86),
        _ => return None,
    };
    Some(PlatformDescriptor::new(os, compiler, arch).with_host(BuildHost::detect()))
}

/// List all built-in profile names with a short description.
pub fn builtin_profiles() -> Vec<(&'static str, &'static str)> {
    vec![
        ("linux-gcc-x86_64", "Linux, GCC, x86-64 (autotools)"),
        ("linux-clang-x86_64", "Linux, Clang, x86-64 (autotools)"),
        ("linux-gcc-armv8", "Linux, GCC, AArch64 (autotools)"),
        ("macos-apple-clang-armv8", "macOS, Apple Clang, Apple silicon (autotools)"),
        ("windows-msvc-x86_64", "Windows, MSVC, x86-64 (CMake)"),
        ("windows-msvc-x86", "Windows, MSVC, x86 (CMake)"),
        ("windows-gcc-x86_64", "Windows, MinGW-w64, x86-64 (autotools)"),
        ("windows-gcc-x86", "Windows, MinGW-w64, x86 (autotools)"),
    ]
}

/// Discover all `.profile.toml` files in a project's `profiles/` directory.
///
/// Returns a list of (profile_name, file_path) pairs.
pub fn discover_profiles(project_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let profiles_dir = project_dir.join("profiles");
    if !profiles_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut profiles = Vec::new();
    for entry in std::fs::read_dir(&profiles_dir)? {
        let path = entry?.path();
        if let Some(name) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".profile.toml"))
        {
            profiles.push((name.to_string(), path.clone()));
        }
    }
    profiles.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(profiles)
}
