//! Build orchestration for the ffpkg recipe.
//!
//! Turns a platform descriptor into a packaged FFMS2 build through a linear
//! pipeline: source preparation, configuration, toolchain invocation, and
//! packaging. MSVC builds go through CMake; everything else goes through
//! autotools.

pub mod autotools;
pub mod cmake;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod package;
pub mod recipe;
pub mod report;
pub mod strategy;
pub mod sysreq;
pub mod toolchain;

pub use config::{compute_build_configuration, BuildConfiguration, BuildTriplet};
pub use error::{BuildError, FailureKind, Result};
pub use orchestrator::{BuildArtifacts, BuildOrchestrator, Stage};
pub use package::{assemble_package, collect_libs, PackageInfo, PackageLayout};
pub use recipe::{DependencyInfo, RecipeConfig, RecipeOptions};
pub use report::{BuildReport, StageTiming};
pub use strategy::{select_strategy, BuildStrategy};
pub use sysreq::{build_requirements, system_requirements, BuildRequirement, ToolInstallOutcome, ToolStatus};
pub use toolchain::{CommandRunner, SystemRunner, ToolInvocation, ToolOutput};
