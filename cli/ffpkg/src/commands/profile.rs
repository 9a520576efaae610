//! `ffpkg profile`: profile listing, description and validation.

use std::path::Path;

use anyhow::{bail, Result};
use ffpkg_build::select_strategy;
use ffpkg_platform::profile::{builtin_profiles, discover_profiles};
use ffpkg_platform::{profile_to_toml, validate_descriptor};

use super::resolve_profile;

/// List built-in profiles and those in the project's `profiles/` directory.
pub fn list(project_dir: &Path) -> Result<()> {
    println!("Built-in profiles:");
    println!();
    for (name, description) in builtin_profiles() {
        println!("  {name:<25} {description}");
    }

    let project = discover_profiles(project_dir)?;
    if !project.is_empty() {
        println!();
        println!("Project profiles:");
        println!();
        for (name, path) in project {
            println!("  {name:<25} {}", path.display());
        }
    }
    println!();
    println!("Use 'ffpkg profile describe <name>' for details.");
    Ok(())
}

pub fn describe(name: &str, project_dir: &Path, format: Option<&str>) -> Result<()> {
    let descriptor = resolve_profile(name, project_dir)?;

    match format {
        Some("toml") => {
            print!("{}", profile_to_toml(&descriptor)?);
            return Ok(());
        }
        Some(other) => bail!("unknown format '{other}' (expected toml)"),
        None => {}
    }

    println!("=== Profile: {} ===", descriptor.name());
    println!("  OS:         {}", descriptor.os);
    println!("  Compiler:   {}", descriptor.compiler);
    println!("  Arch:       {}", descriptor.arch);
    println!("  Build type: {}", descriptor.build_type);
    println!("  Strategy:   {}", select_strategy(&descriptor));
    if descriptor.targets_mingw() {
        match descriptor.arch.mingw_triplet() {
            Some(triplet) => println!("  Host:       {triplet}"),
            None => println!("  Host:       (no known MinGW triplet)"),
        }
    }
    Ok(())
}

/// Print validation issues; fails if any is an error.
pub fn validate(name: &str, project_dir: &Path) -> Result<()> {
    let descriptor = resolve_profile(name, project_dir)?;
    match validate_descriptor(&descriptor) {
        Ok(()) => {
            println!("{}: ok", descriptor.name());
            Ok(())
        }
        Err(issues) => {
            for issue in &issues {
                println!("{}: {}: {}", descriptor.name(), issue.severity, issue.message);
            }
            if issues.iter().any(|i| i.is_error()) {
                bail!("profile '{name}' is not buildable");
            }
            Ok(())
        }
    }
}
