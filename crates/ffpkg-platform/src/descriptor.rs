//! Platform descriptor model.
//!
//! Captures the settings a package build is keyed on: target operating
//! system, compiler family, architecture and build type, together with the
//! host the build runs on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};
use crate::host::BuildHost;

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatingSystem {
    Linux,
    Windows,
    Macos,
    #[serde(rename = "freebsd")]
    FreeBsd,
    Android,
}

impl OperatingSystem {
    /// The operating system this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OperatingSystem::Windows
        } else if cfg!(target_os = "macos") {
            OperatingSystem::Macos
        } else if cfg!(target_os = "freebsd") {
            OperatingSystem::FreeBsd
        } else if cfg!(target_os = "android") {
            OperatingSystem::Android
        } else {
            OperatingSystem::Linux
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperatingSystem::Linux => "linux",
            OperatingSystem::Windows => "windows",
            OperatingSystem::Macos => "macos",
            OperatingSystem::FreeBsd => "freebsd",
            OperatingSystem::Android => "android",
        }
    }
}

impl FromStr for OperatingSystem {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(OperatingSystem::Linux),
            "windows" | "win32" => Ok(OperatingSystem::Windows),
            "macos" | "darwin" => Ok(OperatingSystem::Macos),
            "freebsd" => Ok(OperatingSystem::FreeBsd),
            "android" => Ok(OperatingSystem::Android),
            _ => Err(PlatformError::Unknown {
                setting: "os",
                value: s.to_string(),
                expected: "linux, windows, macos, freebsd, android",
            }),
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiler family used to build the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerFamily {
    Gcc,
    Clang,
    AppleClang,
    /// Microsoft Visual C++ ("Visual Studio").
    #[serde(alias = "visual-studio", alias = "Visual Studio")]
    Msvc,
}

impl CompilerFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::AppleClang => "apple-clang",
            CompilerFamily::Msvc => "msvc",
        }
    }
}

impl FromStr for CompilerFamily {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gcc" | "mingw" => Ok(CompilerFamily::Gcc),
            "clang" => Ok(CompilerFamily::Clang),
            "apple-clang" | "apple_clang" => Ok(CompilerFamily::AppleClang),
            "msvc" | "visual studio" | "visual-studio" | "vs" => Ok(CompilerFamily::Msvc),
            _ => Err(PlatformError::Unknown {
                setting: "compiler",
                value: s.to_string(),
                expected: "gcc, clang, apple-clang, msvc",
            }),
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86,
    X86_64,
    Armv7,
    Armv8,
}

impl Arch {
    /// The architecture this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_arch = "x86") {
            Arch::X86
        } else if cfg!(target_arch = "arm") {
            Arch::Armv7
        } else if cfg!(target_arch = "aarch64") {
            Arch::Armv8
        } else {
            Arch::X86_64
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Armv7 => "armv7",
            Arch::Armv8 => "armv8",
        }
    }

    /// GNU triplet used when cross-compiling for Windows with MinGW.
    ///
    /// Only the two MinGW-w64 toolchains are known; other architectures
    /// have no MinGW triplet.
    pub fn mingw_triplet(self) -> Option<&'static str> {
        match self {
            Arch::X86 => Some("i686-w64-mingw32"),
            Arch::X86_64 => Some("x86_64-w64-mingw32"),
            Arch::Armv7 | Arch::Armv8 => None,
        }
    }
}

impl FromStr for Arch {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x86" | "i686" | "i386" => Ok(Arch::X86),
            "x86_64" | "x86-64" | "amd64" => Ok(Arch::X86_64),
            "armv7" | "arm" => Ok(Arch::Armv7),
            "armv8" | "aarch64" | "arm64" => Ok(Arch::Armv8),
            _ => Err(PlatformError::Unknown {
                setting: "arch",
                value: s.to_string(),
                expected: "x86, x86_64, armv7, armv8",
            }),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build configuration type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildType {
    Debug,
    #[default]
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    /// Name as understood by CMake's `CMAKE_BUILD_TYPE`.
    pub fn as_str(self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
            BuildType::MinSizeRel => "MinSizeRel",
        }
    }

    /// Compiler flags an autotools build gets for this build type.
    pub fn c_flags(self) -> &'static [&'static str] {
        match self {
            BuildType::Debug => &["-g"],
            BuildType::Release => &["-O3", "-DNDEBUG"],
            BuildType::RelWithDebInfo => &["-O2", "-g", "-DNDEBUG"],
            BuildType::MinSizeRel => &["-Os", "-DNDEBUG"],
        }
    }
}

impl FromStr for BuildType {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            "relwithdebinfo" => Ok(BuildType::RelWithDebInfo),
            "minsizerel" => Ok(BuildType::MinSizeRel),
            _ => Err(PlatformError::Unknown {
                setting: "build_type",
                value: s.to_string(),
                expected: "Debug, Release, RelWithDebInfo, MinSizeRel",
            }),
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the recipe needs to know about the target of a build.
///
/// Immutable once constructed; every stage receives it by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformDescriptor {
    /// Target operating system.
    pub os: OperatingSystem,
    /// Compiler family.
    pub compiler: CompilerFamily,
    /// Target architecture.
    pub arch: Arch,
    /// Build type.
    #[serde(default)]
    pub build_type: BuildType,
    /// Machine running the build. Detected when absent from a profile.
    #[serde(default = "BuildHost::detect")]
    pub host: BuildHost,
}

impl PlatformDescriptor {
    /// Create a descriptor for a build on the current host.
    pub fn new(os: OperatingSystem, compiler: CompilerFamily, arch: Arch) -> Self {
        Self {
            os,
            compiler,
            arch,
            build_type: BuildType::default(),
            host: BuildHost::detect(),
        }
    }

    /// Descriptor matching the machine running this binary, with the
    /// platform's default compiler.
    pub fn native() -> Self {
        let os = OperatingSystem::current();
        let compiler = match os {
            OperatingSystem::Windows => CompilerFamily::Msvc,
            OperatingSystem::Macos => CompilerFamily::AppleClang,
            _ => CompilerFamily::Gcc,
        };
        Self::new(os, compiler, Arch::current())
    }

    pub fn with_build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = build_type;
        self
    }

    pub fn with_host(mut self, host: BuildHost) -> Self {
        self.host = host;
        self
    }

    /// Whether the compiler is the MSVC family.
    pub fn is_msvc(&self) -> bool {
        self.compiler == CompilerFamily::Msvc
    }

    /// Whether this is a MinGW gcc build running on a Windows host.
    pub fn is_mingw_on_windows(&self) -> bool {
        self.os == OperatingSystem::Windows
            && self.compiler == CompilerFamily::Gcc
            && self.host.is_windows()
    }

    /// Whether the target is Windows built by a non-MSVC (MinGW) toolchain.
    ///
    /// True both for MSYS2-style builds on a Windows host and for real
    /// cross builds from Linux or macOS.
    pub fn targets_mingw(&self) -> bool {
        self.os == OperatingSystem::Windows
            && matches!(self.compiler, CompilerFamily::Gcc | CompilerFamily::Clang)
    }

    /// Canonical short name, e.g. `windows-msvc-x86_64`.
    pub fn name(&self) -> String {
        format!("{}-{}-{}", self.os, self.compiler, self.arch)
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.build_type)
    }
}
