//! The autotools build: `autoreconf`, `configure`, `make`, `make install`.

use std::path::Path;

use tracing::info;

use crate::config::BuildConfiguration;
use crate::error::Result;
use crate::toolchain::{CommandRunner, ToolInvocation};

/// The configure/build half of the autotools sequence, in order.
pub fn build_plan(config: &BuildConfiguration, source_root: &Path) -> Vec<ToolInvocation> {
    let env = config.environment();
    let step = |program: &str| {
        ToolInvocation::new(program)
            .current_dir(source_root)
            .envs(&env)
            .via_bash(config.win_bash)
    };

    vec![
        step("autoreconf").arg("-vfi"),
        step("sh").arg("./configure").args(config.configure_args()),
        step("make").arg(format!("-j{}", config.jobs)),
    ]
}

/// `make install` into the configured prefix.
pub fn install_step(config: &BuildConfiguration, source_root: &Path) -> ToolInvocation {
    ToolInvocation::new("make")
        .arg("install")
        .current_dir(source_root)
        .envs(&config.environment())
        .via_bash(config.win_bash)
}

/// Run `autoreconf` and `configure`.
pub fn configure(runner: &dyn CommandRunner, config: &BuildConfiguration, source_root: &Path) -> Result<()> {
    for step in &build_plan(config, source_root)[..2] {
        runner.run(step)?;
    }
    info!(prefix = %config.prefix, host = ?config.host_triplet, "configured");
    Ok(())
}

/// Run `make` and `make install`.
pub fn compile(runner: &dyn CommandRunner, config: &BuildConfiguration, source_root: &Path) -> Result<()> {
    for step in &build_plan(config, source_root)[2..] {
        runner.run(step)?;
    }
    runner.run(&install_step(config, source_root))?;
    info!(jobs = config.jobs, "make install finished");
    Ok(())
}
