//! The build pipeline state machine.
//!
//! ```text
//! NotStarted -> SourcePrepared -> Configured -> Built -> Packaged
//!      \              \               \           \
//!       +--------------+---------------+-----------+--> Failed(kind)
//! ```
//!
//! Each stage method checks the current stage first. Calling one out of
//! order returns [`BuildError::InvalidTransition`] and leaves the stage as
//! it was; a stage that fails moves the pipeline to `Failed`, from which
//! nothing further is accepted.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ffpkg_platform::PlatformDescriptor;
use ffpkg_source::{ffms2_patches, SourceFetcher, SourceTree};
use tracing::{error, info, info_span};

use crate::config::{compute_build_configuration, BuildConfiguration};
use crate::error::{BuildError, FailureKind, Result};
use crate::package::{assemble_package, PackageLayout, PACKAGE_INFO_FILE};
use crate::recipe::RecipeConfig;
use crate::report::{BuildReport, StageTiming};
use crate::strategy::{select_strategy, BuildStrategy};
use crate::sysreq::{system_requirements, ToolStatus};
use crate::toolchain::CommandRunner;
use crate::{autotools, cmake};

/// Out-of-tree build directory for the native build system.
pub const BUILD_SUBFOLDER: &str = "build_subfolder";

/// Where a pipeline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NotStarted,
    SourcePrepared,
    Configured,
    Built,
    Packaged,
    Failed(FailureKind),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Stage::NotStarted => "not started".to_string(),
            Stage::SourcePrepared => "source prepared".to_string(),
            Stage::Configured => "configured".to_string(),
            Stage::Built => "built".to_string(),
            Stage::Packaged => "packaged".to_string(),
            Stage::Failed(kind) => format!("failed ({kind})"),
        };
        f.pad(&text)
    }
}

/// Locations produced by a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifacts {
    pub strategy: BuildStrategy,
    pub source_root: PathBuf,
    /// Where the build ran: the source root for autotools, the out-of-tree
    /// build directory for CMake.
    pub build_dir: PathBuf,
    pub package_dir: PathBuf,
}

/// Drives one build of the recipe for one platform.
pub struct BuildOrchestrator<'a> {
    descriptor: PlatformDescriptor,
    recipe: &'a RecipeConfig,
    fetcher: &'a dyn SourceFetcher,
    runner: &'a dyn CommandRunner,
    workdir: PathBuf,
    package_dir: PathBuf,
    strategy: BuildStrategy,
    stage: Stage,
    source: Option<SourceTree>,
    config: Option<BuildConfiguration>,
    artifacts: Option<BuildArtifacts>,
    layout: Option<PackageLayout>,
    tool_outcomes: Vec<ToolStatus>,
    timings: Vec<StageTiming>,
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(
        descriptor: PlatformDescriptor,
        recipe: &'a RecipeConfig,
        fetcher: &'a dyn SourceFetcher,
        runner: &'a dyn CommandRunner,
        workdir: impl Into<PathBuf>,
        package_dir: impl Into<PathBuf>,
    ) -> Self {
        let strategy = select_strategy(&descriptor);
        Self {
            descriptor,
            recipe,
            fetcher,
            runner,
            workdir: workdir.into(),
            package_dir: package_dir.into(),
            strategy,
            stage: Stage::NotStarted,
            source: None,
            config: None,
            artifacts: None,
            layout: None,
            tool_outcomes: Vec::new(),
            timings: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn strategy(&self) -> BuildStrategy {
        self.strategy
    }

    pub fn descriptor(&self) -> &PlatformDescriptor {
        &self.descriptor
    }

    pub fn source_tree(&self) -> Option<&SourceTree> {
        self.source.as_ref()
    }

    pub fn configuration(&self) -> Option<&BuildConfiguration> {
        self.config.as_ref()
    }

    pub fn artifacts(&self) -> Option<&BuildArtifacts> {
        self.artifacts.as_ref()
    }

    pub fn layout(&self) -> Option<&PackageLayout> {
        self.layout.as_ref()
    }

    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    /// Bootstrap the autotools toolchain. Never fails; tools that could not
    /// be installed are reported in the outcome list.
    pub fn check_requirements(&mut self) -> &[ToolStatus] {
        self.tool_outcomes = system_requirements(&self.descriptor, &self.descriptor.host, self.runner);
        &self.tool_outcomes
    }

    /// Fetch and patch the upstream source.
    pub fn prepare_source(&mut self) -> Result<&SourceTree> {
        self.advance("prepare source", Stage::NotStarted, Stage::SourcePrepared, |this| {
            let stale = this.package_dir.join(PACKAGE_INFO_FILE);
            if stale.exists() {
                std::fs::remove_file(&stale)?;
            }
            let tree = ffpkg_source::prepare_source(
                this.fetcher,
                &this.recipe.source_spec(),
                &this.workdir,
                &cmake::exported_files(),
                &ffms2_patches(),
            )?;
            this.source = Some(tree);
            Ok(())
        })?;
        self.source.as_ref().ok_or(BuildError::InvalidTransition {
            operation: "prepare source",
            stage: self.stage,
        })
    }

    /// Compute the build configuration and run the configure step of the
    /// selected strategy.
    pub fn configure(&mut self) -> Result<&BuildConfiguration> {
        self.advance("configure", Stage::SourcePrepared, Stage::Configured, |this| {
            let config = compute_build_configuration(&this.descriptor, this.recipe, &this.package_dir)?;
            let source_root = this.source_root()?;
            match this.strategy {
                BuildStrategy::Autotools => autotools::configure(this.runner, &config, &source_root)?,
                BuildStrategy::NativeBuildSystem => cmake::configure(
                    this.runner,
                    &this.descriptor,
                    &config,
                    &this.recipe.dependency,
                    &source_root,
                    &this.workdir.join(BUILD_SUBFOLDER),
                )?,
            }
            this.config = Some(config);
            Ok(())
        })?;
        self.config.as_ref().ok_or(BuildError::InvalidTransition {
            operation: "configure",
            stage: self.stage,
        })
    }

    /// Compile (and for autotools, install into the package directory).
    pub fn build(&mut self) -> Result<&BuildArtifacts> {
        self.advance("build", Stage::Configured, Stage::Built, |this| {
            let source_root = this.source_root()?;
            let config = this.config.as_ref().ok_or(BuildError::InvalidTransition {
                operation: "build",
                stage: this.stage,
            })?;
            let build_dir = match this.strategy {
                BuildStrategy::Autotools => {
                    autotools::compile(this.runner, config, &source_root)?;
                    source_root.clone()
                }
                BuildStrategy::NativeBuildSystem => {
                    let build_dir = this.workdir.join(BUILD_SUBFOLDER);
                    cmake::compile(this.runner, config, &build_dir)?;
                    build_dir
                }
            };
            this.artifacts = Some(BuildArtifacts {
                strategy: this.strategy,
                source_root,
                build_dir,
                package_dir: this.package_dir.clone(),
            });
            Ok(())
        })?;
        self.artifacts.as_ref().ok_or(BuildError::InvalidTransition {
            operation: "build",
            stage: self.stage,
        })
    }

    /// Assemble the package layout.
    pub fn package(&mut self) -> Result<&PackageLayout> {
        self.advance("package", Stage::Built, Stage::Packaged, |this| {
            let (Some(artifacts), Some(config)) = (&this.artifacts, &this.config) else {
                return Err(BuildError::InvalidTransition {
                    operation: "package",
                    stage: this.stage,
                });
            };
            let layout = assemble_package(this.runner, artifacts, this.recipe, config)?;
            this.layout = Some(layout);
            Ok(())
        })?;
        self.layout.as_ref().ok_or(BuildError::InvalidTransition {
            operation: "package",
            stage: self.stage,
        })
    }

    /// Run every stage in order and summarize.
    pub fn run(&mut self) -> Result<BuildReport> {
        let span = info_span!("build", recipe = %self.recipe.reference(), target = %self.descriptor.name());
        let _guard = span.enter();
        info!(strategy = %self.strategy, "starting build");

        self.check_requirements();
        self.prepare_source()?;
        self.configure()?;
        self.build()?;
        self.package()?;

        Ok(self.report())
    }

    /// Summary of the stages completed so far.
    pub fn report(&self) -> BuildReport {
        BuildReport {
            recipe: self.recipe.reference(),
            target: self.descriptor.name(),
            strategy: self.strategy,
            host_triplet: self.config.as_ref().and_then(|c| c.host_triplet.clone()),
            stages: self.timings.clone(),
            libs: self
                .layout
                .as_ref()
                .map(|l| l.info.libs.clone())
                .unwrap_or_default(),
            package_dir: self.package_dir.clone(),
            tool_outcomes: self.tool_outcomes.clone(),
        }
    }

    fn source_root(&self) -> Result<PathBuf> {
        self.source
            .as_ref()
            .map(|s| s.root().to_path_buf())
            .ok_or(BuildError::InvalidTransition {
                operation: "locate source",
                stage: self.stage,
            })
    }

    /// Run `f` if the pipeline is at `from`, then move to `to`; a failure
    /// moves it to `Failed`.
    fn advance(
        &mut self,
        operation: &'static str,
        from: Stage,
        to: Stage,
        f: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        if self.stage != from {
            return Err(BuildError::InvalidTransition {
                operation,
                stage: self.stage,
            });
        }

        let start = Instant::now();
        match f(self) {
            Ok(()) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                self.stage = to;
                self.timings.push(StageTiming { stage: to, duration_ms });
                info!(stage = %to, duration_ms, "stage complete");
                Ok(())
            }
            Err(e) => {
                let kind = e.kind();
                self.stage = Stage::Failed(kind);
                error!(operation, kind = %kind, "stage failed");
                Err(e)
            }
        }
    }
}
