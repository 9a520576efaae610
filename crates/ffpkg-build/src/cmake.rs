//! The CMake build used for MSVC.
//!
//! Upstream ships no CMake project, so the recipe exports its own
//! `CMakeLists.txt` into the source tree. Dependency locations reach it
//! through a generated `buildinfo.cmake` written next to it.

use std::fmt::Write as _;
use std::path::Path;

use ffpkg_platform::{Arch, PlatformDescriptor};
use ffpkg_source::ExportedFile;
use tracing::info;

use crate::config::BuildConfiguration;
use crate::error::Result;
use crate::recipe::DependencyInfo;
use crate::toolchain::{CommandRunner, ToolInvocation};

/// File name of the generated dependency description.
pub const BUILD_INFO_FILE: &str = "buildinfo.cmake";

/// The exported CMake project.
pub const CMAKE_LISTS: &str = include_str!("../assets/CMakeLists.txt");

/// Files the recipe exports into the source tree.
pub fn exported_files() -> Vec<ExportedFile> {
    vec![ExportedFile::new("CMakeLists.txt", CMAKE_LISTS)]
}

/// Contents of `buildinfo.cmake` for `dep`.
pub fn build_info(dep: &DependencyInfo) -> String {
    let var = dep.name.to_uppercase();
    let join = |paths: &[std::path::PathBuf]| {
        paths
            .iter()
            .map(|p| format!("\"{}\"", cmake_path(p)))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut out = String::new();
    let _ = writeln!(out, "# Generated by ffpkg for {} {}", dep.name, dep.version);
    let _ = writeln!(out, "set(FFPKG_{var}_VERSION \"{}\")", dep.version);
    let _ = writeln!(out, "set(FFPKG_{var}_INCLUDE_DIRS {})", join(&dep.include_paths));
    let _ = writeln!(out, "set(FFPKG_{var}_LIB_DIRS {})", join(&dep.lib_paths));
    let _ = writeln!(out, "set(FFPKG_{var}_LIBS {})", dep.libs.join(" "));
    out
}

/// Write `buildinfo.cmake` into the source root.
pub fn write_build_info(source_root: &Path, dep: &DependencyInfo) -> Result<()> {
    std::fs::write(source_root.join(BUILD_INFO_FILE), build_info(dep))?;
    Ok(())
}

fn cmake_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Visual Studio generator platform for `arch`.
pub fn generator_platform(arch: Arch) -> &'static str {
    match arch {
        Arch::X86 => "Win32",
        Arch::X86_64 => "x64",
        Arch::Armv7 => "ARM",
        Arch::Armv8 => "ARM64",
    }
}

pub fn configure_step(
    descriptor: &PlatformDescriptor,
    config: &BuildConfiguration,
    source_root: &Path,
    build_dir: &Path,
) -> ToolInvocation {
    ToolInvocation::new("cmake")
        .arg("-S")
        .arg(source_root.display().to_string())
        .arg("-B")
        .arg(build_dir.display().to_string())
        .arg(format!("-DCMAKE_BUILD_TYPE={}", config.build_type.as_str()))
        .arg(format!("-DCMAKE_INSTALL_PREFIX={}", config.prefix))
        .arg("-A")
        .arg(generator_platform(descriptor.arch))
}

pub fn build_step(config: &BuildConfiguration, build_dir: &Path) -> ToolInvocation {
    ToolInvocation::new("cmake")
        .arg("--build")
        .arg(build_dir.display().to_string())
        .arg("--config")
        .arg(config.build_type.as_str())
        .arg("--parallel")
        .arg(config.jobs.to_string())
}

pub fn install_step(config: &BuildConfiguration, build_dir: &Path) -> ToolInvocation {
    ToolInvocation::new("cmake")
        .arg("--install")
        .arg(build_dir.display().to_string())
        .arg("--config")
        .arg(config.build_type.as_str())
}

/// Write the build info and configure the build directory.
pub fn configure(
    runner: &dyn CommandRunner,
    descriptor: &PlatformDescriptor,
    config: &BuildConfiguration,
    dep: &DependencyInfo,
    source_root: &Path,
    build_dir: &Path,
) -> Result<()> {
    write_build_info(source_root, dep)?;
    std::fs::create_dir_all(build_dir)?;
    runner.run(&configure_step(descriptor, config, source_root, build_dir))?;
    info!(build_dir = %build_dir.display(), "cmake configured");
    Ok(())
}

pub fn compile(runner: &dyn CommandRunner, config: &BuildConfiguration, build_dir: &Path) -> Result<()> {
    runner.run(&build_step(config, build_dir))?;
    Ok(())
}
