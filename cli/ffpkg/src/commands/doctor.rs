//! `ffpkg doctor`: build host diagnostics.

use std::path::Path;

use anyhow::Result;
use ffpkg_build::package::PACKAGE_INFO_FILE;
use ffpkg_build::sysreq::{AUTOTOOLS_TOOLS, BASH_PATH_ENV};
use ffpkg_build::{build_requirements, select_strategy, BuildStrategy, CommandRunner, PackageLayout, SystemRunner, ToolInvocation};
use ffpkg_platform::PlatformDescriptor;

use crate::manifest::{FfpkgManifest, MANIFEST_FILE};

/// Print build host and toolchain information. Installs nothing.
pub fn run(project_dir: &Path, descriptor: &PlatformDescriptor) -> Result<()> {
    println!("=== ffpkg Doctor ===");
    println!();
    println!("ffpkg version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("--- Build Host ---");
    let host = &descriptor.host;
    println!("  OS:        {}", host.os);
    match host.subsystem {
        Some(subsystem) => println!("  Subsystem: {subsystem:?}"),
        None => println!("  Subsystem: none"),
    }
    println!("  sudo:      {}", if host.sudo_allowed() { "allowed" } else { "disabled" });
    let bash_path = std::env::var(BASH_PATH_ENV).ok();
    for requirement in build_requirements(host, bash_path.as_deref()) {
        println!("  Requires:  {requirement}");
    }
    println!();

    let strategy = select_strategy(descriptor);
    println!("--- Target: {descriptor} ---");
    println!("  Strategy: {strategy}");
    if let Some(triplet) = descriptor.arch.mingw_triplet().filter(|_| descriptor.targets_mingw()) {
        println!("  Host triplet: {triplet}");
    }
    println!();

    println!("--- Tools ---");
    let runner = SystemRunner::new();
    for tool in required_tools(strategy) {
        print_tool_status(&runner, tool);
    }
    println!();

    println!("--- Project Status ---");
    let package_dir = match FfpkgManifest::find_and_load(project_dir) {
        Ok(Some((manifest, dir))) => {
            let recipe = manifest.recipe(&dir);
            println!("  {MANIFEST_FILE}: found at {}", dir.display());
            println!("  Recipe:    {}", recipe.reference());
            println!("  Revision:  {}", recipe.revision);
            match recipe.dependency.lib_dir() {
                Some(lib) => println!("  FFmpeg:    {}", lib.display()),
                None => println!("  FFmpeg:    not configured (set [dependency] prefix or --ffmpeg-prefix)"),
            }
            manifest.package_dir(&dir)
        }
        Ok(None) => {
            println!("  {MANIFEST_FILE}: not found (using defaults)");
            FfpkgManifest::default().package_dir(project_dir)
        }
        Err(e) => {
            println!("  {MANIFEST_FILE}: error: {e:#}");
            return Ok(());
        }
    };
    println!("  Package:   {}", package_status(&package_dir));

    Ok(())
}

/// One-line summary of the package at `package_dir`, if one was assembled.
pub fn package_status(package_dir: &Path) -> String {
    if !package_dir.join(PACKAGE_INFO_FILE).is_file() {
        return format!("none at {}", package_dir.display());
    }
    match PackageLayout::load(package_dir) {
        Ok(layout) => format!(
            "{} {} at {} (libs: {})",
            layout.info.name,
            layout.info.version,
            layout.root.display(),
            layout.info.libs.join(", ")
        ),
        Err(e) => format!("unreadable {PACKAGE_INFO_FILE} in {}: {e}", package_dir.display()),
    }
}

/// Tools a build with `strategy` will call.
pub fn required_tools(strategy: BuildStrategy) -> Vec<&'static str> {
    let mut tools = vec!["curl", "tar"];
    match strategy {
        BuildStrategy::Autotools => {
            tools.extend_from_slice(AUTOTOOLS_TOOLS);
            tools.push("bash");
        }
        BuildStrategy::NativeBuildSystem => tools.push("cmake"),
    }
    tools
}

fn print_tool_status(runner: &dyn CommandRunner, name: &str) {
    match runner.execute(&ToolInvocation::new(name).arg("--version")) {
        Ok(output) => {
            let first_line = output.stdout.lines().next().unwrap_or("(unknown version)");
            println!("  {name}: {first_line}");
        }
        Err(_) => println!("  {name}: not found"),
    }
}
