//! Build-host detection.
//!
//! The host is the machine running the recipe. It matters for two
//! decisions: whether autotools commands need to be run through a bash
//! shell (Windows hosts), and whether system packages may be installed with
//! `sudo` (not inside MSYS2 or Cygwin).

use serde::{Deserialize, Serialize};

use crate::descriptor::OperatingSystem;

/// A POSIX compatibility layer the build may be running inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subsystem {
    Msys2,
    Cygwin,
    /// Windows Subsystem for Linux. Behaves like a regular Linux host.
    Wsl,
}

/// The machine a build runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildHost {
    /// Host operating system.
    pub os: OperatingSystem,
    /// Compatibility layer, if any.
    #[serde(default)]
    pub subsystem: Option<Subsystem>,
}

impl BuildHost {
    /// Detect the host from the compile target and process environment.
    pub fn detect() -> Self {
        Self::detect_with(OperatingSystem::current(), |key| std::env::var(key).ok())
    }

    /// Detect the host using an explicit OS and environment lookup.
    pub fn detect_with(os: OperatingSystem, env: impl Fn(&str) -> Option<String>) -> Self {
        let subsystem = match os {
            OperatingSystem::Windows => {
                if env("MSYSTEM").is_some() {
                    Some(Subsystem::Msys2)
                } else if env("OSTYPE").is_some_and(|v| v.contains("cygwin")) {
                    Some(Subsystem::Cygwin)
                } else {
                    None
                }
            }
            OperatingSystem::Linux => {
                if env("WSL_DISTRO_NAME").is_some() || env("WSL_INTEROP").is_some() {
                    Some(Subsystem::Wsl)
                } else {
                    None
                }
            }
            _ => None,
        };
        BuildHost { os, subsystem }
    }

    pub fn is_windows(&self) -> bool {
        self.os == OperatingSystem::Windows
    }

    /// Whether system package installation may go through `sudo`.
    pub fn sudo_allowed(&self) -> bool {
        match self.subsystem {
            Some(Subsystem::Wsl) => true,
            Some(_) => false,
            None => !self.is_windows(),
        }
    }
}

impl Default for BuildHost {
    fn default() -> Self {
        Self::detect()
    }
}
