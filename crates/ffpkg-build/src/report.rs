//! Build report aggregating all pipeline stages.

use std::fmt;
use std::path::PathBuf;

use crate::orchestrator::Stage;
use crate::strategy::BuildStrategy;
use crate::sysreq::ToolStatus;

/// Wall-clock time spent reaching one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: u64,
}

/// Summary of a finished build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// `name/version` of the recipe.
    pub recipe: String,
    /// Target platform name.
    pub target: String,
    pub strategy: BuildStrategy,
    pub host_triplet: Option<String>,
    pub stages: Vec<StageTiming>,
    /// Libraries recorded in the package.
    pub libs: Vec<String>,
    pub package_dir: PathBuf,
    /// Build tool bootstrap results (empty for MSVC).
    pub tool_outcomes: Vec<ToolStatus>,
}

impl BuildReport {
    pub fn total_ms(&self) -> u64 {
        self.stages.iter().map(|s| s.duration_ms).sum()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Build Report ===")?;
        writeln!(f, "Recipe: {}", self.recipe)?;
        writeln!(f, "Target: {}", self.target)?;
        writeln!(f, "Strategy: {}", self.strategy)?;
        if let Some(host) = &self.host_triplet {
            writeln!(f, "Host triplet: {host}")?;
        }
        writeln!(f, "Duration: {} ms", self.total_ms())?;

        if !self.tool_outcomes.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Build tools ---")?;
            for status in &self.tool_outcomes {
                writeln!(f, "  {:<12} {}", status.tool, status.outcome)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "--- Stages ---")?;
        for timing in &self.stages {
            writeln!(f, "  {:<16} {} ms", timing.stage, timing.duration_ms)?;
        }

        writeln!(f)?;
        writeln!(f, "--- Package ---")?;
        writeln!(f, "  Location: {}", self.package_dir.display())?;
        writeln!(f, "  Libs: {}", self.libs.join(", "))?;
        Ok(())
    }
}
