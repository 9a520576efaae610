//! Build strategy selection.

use std::fmt;

use ffpkg_platform::PlatformDescriptor;

/// How the library is configured and compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStrategy {
    /// CMake with the recipe's exported `CMakeLists.txt`.
    NativeBuildSystem,
    /// `autoreconf` + `configure` + `make`.
    Autotools,
}

impl BuildStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildStrategy::NativeBuildSystem => "cmake",
            BuildStrategy::Autotools => "autotools",
        }
    }
}

impl fmt::Display for BuildStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MSVC cannot drive the autotools build, so it gets CMake; every other
/// compiler family uses autotools.
pub fn select_strategy(descriptor: &PlatformDescriptor) -> BuildStrategy {
    if descriptor.is_msvc() {
        BuildStrategy::NativeBuildSystem
    } else {
        BuildStrategy::Autotools
    }
}
