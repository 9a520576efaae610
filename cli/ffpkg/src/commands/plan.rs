//! `ffpkg plan`: show what a build would do without running anything.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use ffpkg_build::orchestrator::BUILD_SUBFOLDER;
use ffpkg_build::{autotools, cmake, compute_build_configuration, select_strategy, BuildStrategy, RecipeConfig};
use ffpkg_platform::PlatformDescriptor;
use ffpkg_source::SOURCE_SUBFOLDER;
use serde::Serialize;

use super::Locations;

/// The decisions a build would make for one target.
#[derive(Debug, Serialize)]
pub struct BuildPlan {
    pub target: String,
    pub strategy: String,
    pub archive_url: String,
    pub prefix: String,
    pub host_triplet: Option<String>,
    pub fpic: Option<bool>,
    pub win_bash: bool,
    pub env: BTreeMap<String, String>,
    pub commands: Vec<String>,
}

pub fn plan(descriptor: &PlatformDescriptor, recipe: &RecipeConfig, locations: &Locations) -> Result<BuildPlan> {
    let strategy = select_strategy(descriptor);
    let config = compute_build_configuration(descriptor, recipe, &locations.package_dir)?;
    let source_root = locations.workdir.join(SOURCE_SUBFOLDER);

    let (env, commands) = match strategy {
        BuildStrategy::Autotools => {
            let mut steps = autotools::build_plan(&config, &source_root);
            steps.push(autotools::install_step(&config, &source_root));
            (config.environment(), steps)
        }
        BuildStrategy::NativeBuildSystem => {
            let build_dir = locations.workdir.join(BUILD_SUBFOLDER);
            let steps = vec![
                cmake::configure_step(descriptor, &config, &source_root, &build_dir),
                cmake::build_step(&config, &build_dir),
                cmake::install_step(&config, &build_dir),
            ];
            (BTreeMap::new(), steps)
        }
    };

    Ok(BuildPlan {
        target: descriptor.name(),
        strategy: strategy.to_string(),
        archive_url: recipe.source_spec().archive_url(),
        prefix: config.prefix.clone(),
        host_triplet: config.host_triplet.clone(),
        fpic: config.fpic,
        win_bash: config.win_bash,
        env,
        commands: commands.iter().map(|c| c.command_line()).collect(),
    })
}

pub fn run(descriptor: &PlatformDescriptor, recipe: &RecipeConfig, locations: &Locations, format: &str) -> Result<()> {
    let plan = plan(descriptor, recipe, locations)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&plan)?),
        "text" => print_plan(&plan),
        other => bail!("unknown format '{other}' (expected text or json)"),
    }
    Ok(())
}

fn print_plan(plan: &BuildPlan) {
    println!("=== Build Plan: {} ===", plan.target);
    println!("Strategy: {}", plan.strategy);
    println!("Source:   {}", plan.archive_url);
    println!("Prefix:   {}", plan.prefix);
    if let Some(host) = &plan.host_triplet {
        println!("Host:     {host}");
    }
    if let Some(fpic) = plan.fpic {
        println!("fPIC:     {fpic}");
    }
    if plan.win_bash {
        println!("Shell:    bash");
    }
    if !plan.env.is_empty() {
        println!();
        println!("--- Environment ---");
        for (key, value) in &plan.env {
            println!("  {key}={value}");
        }
    }
    println!();
    println!("--- Commands ---");
    for command in &plan.commands {
        println!("  {command}");
    }
}
