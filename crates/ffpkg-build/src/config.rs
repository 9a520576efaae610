//! Build configuration: install prefix, triplets, flags and environment.
//!
//! Everything here is derived deterministically from the platform
//! descriptor, the recipe and the package directory. Nothing touches the
//! filesystem or spawns a process.

use std::collections::BTreeMap;
use std::path::Path;

use ffpkg_platform::{BuildType, OperatingSystem, PlatformDescriptor};

use crate::error::{BuildError, Result};
use crate::recipe::RecipeConfig;

/// What configure is told about the build machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTriplet {
    /// No `--build` flag; configure guesses.
    Detect,
    /// `--build` is suppressed outright. Used for MinGW targets, where
    /// autotools' guess under MSYS2 confuses the cross setup.
    Disabled,
    /// `--build=<triplet>`.
    Explicit(String),
}

/// Computed configuration for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    /// Absolute install prefix (forward slashes for Windows targets).
    pub prefix: String,
    /// Build static libraries only.
    pub static_only: bool,
    /// `--host` triplet; set only for MinGW targets.
    pub host_triplet: Option<String>,
    pub build_triplet: BuildTriplet,
    /// Position-independent code. `None` where the option does not apply.
    pub fpic: Option<bool>,
    pub build_type: BuildType,
    /// Run autotools commands through bash (Windows hosts).
    pub win_bash: bool,
    /// Variables exported for the dependency (`FFMPEG_LIBS`, `FFMPEG_CFLAGS`).
    pub extra_env: BTreeMap<String, String>,
    /// Parallel jobs for `make` / `cmake --build`.
    pub jobs: usize,
}

impl BuildConfiguration {
    /// Arguments passed to `./configure`.
    pub fn configure_args(&self) -> Vec<String> {
        let mut args = vec![format!("--prefix={}", self.prefix)];
        if self.static_only {
            args.push("--enable-static".into());
            args.push("--disable-shared".into());
        }
        if let Some(host) = &self.host_triplet {
            args.push(format!("--host={host}"));
        }
        if let BuildTriplet::Explicit(build) = &self.build_triplet {
            args.push(format!("--build={build}"));
        }
        args
    }

    /// Full environment for autotools commands: dependency variables plus
    /// compiler flags for the build type and `-fPIC`. Flags already set in
    /// the process environment are kept in front of ours.
    pub fn environment(&self) -> BTreeMap<String, String> {
        self.environment_with(|name| std::env::var(name).ok())
    }

    /// [`environment`](Self::environment) with `inherited` as the source of
    /// existing `CFLAGS`/`CXXFLAGS`.
    pub fn environment_with(&self, inherited: impl Fn(&str) -> Option<String>) -> BTreeMap<String, String> {
        let mut flags: Vec<&str> = self.build_type.c_flags().to_vec();
        if self.fpic == Some(true) {
            flags.push("-fPIC");
        }
        let flags = flags.join(" ");

        let mut env = self.extra_env.clone();
        for var in ["CFLAGS", "CXXFLAGS"] {
            let value = match inherited(var).filter(|v| !v.trim().is_empty()) {
                Some(existing) => format!("{} {flags}", existing.trim()),
                None => flags.clone(),
            };
            env.insert(var.into(), value);
        }
        env
    }
}

/// Derive the build configuration for `descriptor`.
///
/// Fails if the dependency has no include or lib path to point the build at.
pub fn compute_build_configuration(
    descriptor: &PlatformDescriptor,
    recipe: &RecipeConfig,
    package_dir: &Path,
) -> Result<BuildConfiguration> {
    let dep = &recipe.dependency;
    let lib_dir = dep.lib_dir().ok_or_else(|| BuildError::MissingDependency {
        name: dep.name.clone(),
        kind: "lib",
    })?;
    let include_dir = dep.include_dir().ok_or_else(|| BuildError::MissingDependency {
        name: dep.name.clone(),
        kind: "include",
    })?;

    let mut prefix = absolute(package_dir)?;
    if descriptor.os == OperatingSystem::Windows {
        prefix = prefix.replace('\\', "/");
    }

    let (host_triplet, build_triplet) = if descriptor.targets_mingw() {
        (
            descriptor.arch.mingw_triplet().map(String::from),
            BuildTriplet::Disabled,
        )
    } else {
        let build = match &recipe.options.build_triplet {
            Some(triplet) => BuildTriplet::Explicit(triplet.clone()),
            None => BuildTriplet::Detect,
        };
        (None, build)
    };

    let fpic = (descriptor.os != OperatingSystem::Windows).then_some(recipe.options.fpic);

    let mut extra_env = BTreeMap::new();
    extra_env.insert("FFMPEG_LIBS".to_string(), format!("-L{}", lib_dir.display()));
    extra_env.insert(
        "FFMPEG_CFLAGS".to_string(),
        format!("-I{}", include_dir.display()),
    );

    Ok(BuildConfiguration {
        prefix,
        static_only: true,
        host_triplet,
        build_triplet,
        fpic,
        build_type: descriptor.build_type,
        win_bash: descriptor.host.is_windows(),
        extra_env,
        jobs: std::thread::available_parallelism().map_or(1, |n| n.get()),
    })
}

fn absolute(path: &Path) -> Result<String> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(abs.display().to_string())
}
