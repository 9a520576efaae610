//! `ffpkg clean`: remove build trees.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::Locations;

/// Remove the working directory, and the package directory with `all`.
pub fn run(locations: &Locations, all: bool) -> Result<()> {
    remove(&locations.workdir)?;
    if all {
        remove(&locations.package_dir)?;
    }
    Ok(())
}

fn remove(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("removing {}", dir.display()))?;
        println!("Removed {}", dir.display());
    } else {
        println!("Already clean: {} does not exist", dir.display());
    }
    Ok(())
}
