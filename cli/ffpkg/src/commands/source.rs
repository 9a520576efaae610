//! `ffpkg source`: fetch and patch the upstream tree only.

use anyhow::{Context, Result};
use ffpkg_build::{cmake, RecipeConfig};
use ffpkg_source::{ffms2_patches, prepare_source, SourceFetcher, SourceTree};

use super::build::fetcher;
use super::{Locations, SourceArgs};

pub fn run(recipe: &RecipeConfig, locations: &Locations, source: &SourceArgs) -> Result<()> {
    let fetcher = fetcher(source);
    let tree = prepare(recipe, locations, fetcher.as_ref())?;
    println!("Source ready: {}", tree.root().display());
    println!("Revision:     {}", tree.revision());
    Ok(())
}

pub fn prepare(recipe: &RecipeConfig, locations: &Locations, fetcher: &dyn SourceFetcher) -> Result<SourceTree> {
    let spec = recipe.source_spec();
    prepare_source(
        fetcher,
        &spec,
        &locations.workdir,
        &cmake::exported_files(),
        &ffms2_patches(),
    )
    .with_context(|| format!("preparing {}", spec.archive_url()))
}
