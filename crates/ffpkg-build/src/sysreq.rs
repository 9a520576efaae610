//! Build tool bootstrapping.
//!
//! Autotools builds need a handful of GNU tools on the build machine. The
//! recipe tries to install missing ones through the system package manager,
//! but this is best effort: a tool it cannot install is reported and the
//! build carries on, since it may be available by other means.

use std::fmt;
use std::path::PathBuf;

use ffpkg_platform::{BuildHost, PlatformDescriptor};
use tracing::{debug, info, warn};

use crate::toolchain::{CommandRunner, ToolInvocation};

/// Tools the autotools build needs.
pub const AUTOTOOLS_TOOLS: &[&str] = &["autoconf", "automake", "libtool", "make", "pkg-config"];

/// Environment variable naming a bash to use on Windows hosts.
pub const BASH_PATH_ENV: &str = "FFPKG_BASH_PATH";

/// A system package manager the recipe knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
    Brew,
}

impl PackageManager {
    const ALL: [PackageManager; 4] = [
        PackageManager::Apt,
        PackageManager::Dnf,
        PackageManager::Pacman,
        PackageManager::Brew,
    ];

    pub fn program(self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
            PackageManager::Brew => "brew",
        }
    }

    fn install_args(self, package: &str) -> Vec<String> {
        let args: &[&str] = match self {
            PackageManager::Apt | PackageManager::Dnf => &["install", "-y"],
            PackageManager::Pacman => &["-S", "--noconfirm", "--needed"],
            PackageManager::Brew => &["install"],
        };
        args.iter()
            .map(|a| a.to_string())
            .chain(std::iter::once(package.to_string()))
            .collect()
    }

    /// The install command, wrapped in `sudo` when allowed. Homebrew refuses
    /// to run as root and never gets `sudo`.
    pub fn install_invocation(self, package: &str, sudo: bool) -> ToolInvocation {
        if sudo && self != PackageManager::Brew {
            ToolInvocation::new("sudo")
                .arg(self.program())
                .args(self.install_args(package))
        } else {
            ToolInvocation::new(self.program()).args(self.install_args(package))
        }
    }

    /// First package manager found on the build machine.
    pub fn detect(runner: &dyn CommandRunner) -> Option<Self> {
        Self::ALL.into_iter().find(|pm| runner.probe(pm.program()))
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// What happened when the recipe tried to make a tool available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInstallOutcome {
    AlreadyPresent,
    Installed { manager: PackageManager },
    /// Not fatal; the build proceeds and fails later if the tool is really
    /// missing.
    Unavailable { reason: String },
}

impl fmt::Display for ToolInstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolInstallOutcome::AlreadyPresent => f.write_str("present"),
            ToolInstallOutcome::Installed { manager } => write!(f, "installed via {manager}"),
            ToolInstallOutcome::Unavailable { reason } => write!(f, "unavailable ({reason})"),
        }
    }
}

/// Outcome for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub tool: String,
    pub outcome: ToolInstallOutcome,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        !matches!(self.outcome, ToolInstallOutcome::Unavailable { .. })
    }
}

/// Make sure the autotools toolchain is installed.
///
/// MSVC builds use CMake and need none of it, so nothing is checked for
/// them. Every tool that is missing and cannot be installed is logged at
/// `warn` and reported as [`ToolInstallOutcome::Unavailable`].
pub fn system_requirements(
    descriptor: &PlatformDescriptor,
    host: &BuildHost,
    runner: &dyn CommandRunner,
) -> Vec<ToolStatus> {
    if descriptor.is_msvc() {
        debug!("msvc build, skipping autotools requirements");
        return Vec::new();
    }

    let sudo = host.sudo_allowed();
    let mut manager: Option<Option<PackageManager>> = None;

    AUTOTOOLS_TOOLS
        .iter()
        .map(|&tool| {
            let outcome = if runner.probe(tool) {
                ToolInstallOutcome::AlreadyPresent
            } else {
                let pm = *manager.get_or_insert_with(|| PackageManager::detect(runner));
                install(runner, pm, tool, sudo)
            };
            match &outcome {
                ToolInstallOutcome::Unavailable { reason } => {
                    warn!(tool, reason = %reason, "unable to bootstrap build tool; ignore if it is already installed");
                }
                ToolInstallOutcome::Installed { manager } => {
                    info!(tool, manager = %manager, "installed build tool");
                }
                ToolInstallOutcome::AlreadyPresent => debug!(tool, "build tool present"),
            }
            ToolStatus {
                tool: tool.to_string(),
                outcome,
            }
        })
        .collect()
}

fn install(
    runner: &dyn CommandRunner,
    manager: Option<PackageManager>,
    tool: &str,
    sudo: bool,
) -> ToolInstallOutcome {
    let Some(manager) = manager else {
        return ToolInstallOutcome::Unavailable {
            reason: "no supported package manager found".into(),
        };
    };
    match runner.run(&manager.install_invocation(tool, sudo)) {
        Ok(_) => ToolInstallOutcome::Installed { manager },
        Err(e) => ToolInstallOutcome::Unavailable {
            reason: e.to_string().lines().next().unwrap_or_default().to_string(),
        },
    }
}

/// Something the build machine must provide before the build starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildRequirement {
    /// No bash was supplied on a Windows host; an MSYS2 shell has to be
    /// bootstrapped.
    Msys2Shell,
    /// Use this already available bash.
    Bash(PathBuf),
}

impl fmt::Display for BuildRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildRequirement::Msys2Shell => f.write_str("msys2 shell"),
            BuildRequirement::Bash(path) => write!(f, "bash at {}", path.display()),
        }
    }
}

/// Build-time requirements for `host`. `bash_path` is the value of
/// [`BASH_PATH_ENV`], if set.
pub fn build_requirements(host: &BuildHost, bash_path: Option<&str>) -> Vec<BuildRequirement> {
    if !host.is_windows() {
        return Vec::new();
    }
    match bash_path {
        Some(path) if !path.is_empty() => vec![BuildRequirement::Bash(PathBuf::from(path))],
        _ => vec![BuildRequirement::Msys2Shell],
    }
}
