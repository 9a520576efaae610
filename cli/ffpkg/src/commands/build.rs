//! `ffpkg build`: fetch, configure, build and package.

use anyhow::{Context, Result};
use ffpkg_build::sysreq::BASH_PATH_ENV;
use ffpkg_build::{
    build_requirements, BuildOrchestrator, BuildReport, BuildRequirement, CommandRunner, RecipeConfig, SystemRunner,
};
use ffpkg_platform::PlatformDescriptor;
use ffpkg_source::{ArchiveFetcher, LocalTreeFetcher, SourceFetcher};
use tracing::{info, warn};

use super::{Locations, SourceArgs};

/// Run the whole pipeline with the system toolchain and print the report.
pub fn run(
    descriptor: &PlatformDescriptor,
    recipe: &RecipeConfig,
    locations: &Locations,
    source: &SourceArgs,
    skip_sysreq: bool,
) -> Result<()> {
    let runner = system_runner(descriptor)?;
    let fetcher = fetcher(source);
    let report = run_with(descriptor, recipe, locations, fetcher.as_ref(), &runner, skip_sysreq)?;
    println!("{report}");
    Ok(())
}

/// Run the pipeline against the given fetcher and runner.
pub fn run_with(
    descriptor: &PlatformDescriptor,
    recipe: &RecipeConfig,
    locations: &Locations,
    fetcher: &dyn SourceFetcher,
    runner: &dyn CommandRunner,
    skip_sysreq: bool,
) -> Result<BuildReport> {
    info!(target_platform = %descriptor, recipe = %recipe.reference(), "building");
    let mut orch = BuildOrchestrator::new(
        descriptor.clone(),
        recipe,
        fetcher,
        runner,
        &locations.workdir,
        &locations.package_dir,
    );

    if !skip_sysreq {
        orch.check_requirements();
    }
    orch.prepare_source().context("preparing source")?;
    orch.configure().context("configuring")?;
    orch.build().context("building")?;
    orch.package().context("packaging")?;
    Ok(orch.report())
}

/// The fetcher for `--source-dir`, or the archive downloader.
pub fn fetcher(source: &SourceArgs) -> Box<dyn SourceFetcher> {
    match &source.source_dir {
        Some(dir) => Box::new(LocalTreeFetcher::new(dir.clone())),
        None => Box::new(ArchiveFetcher {
            keep_archive: source.keep_archive,
        }),
    }
}

/// A runner for the build host. On Windows hosts autotools commands go
/// through the bash named by `FFPKG_BASH_PATH`, or an MSYS2 bash on `PATH`.
fn system_runner(descriptor: &PlatformDescriptor) -> Result<SystemRunner> {
    let bash_path = std::env::var(BASH_PATH_ENV).ok();
    let mut runner = SystemRunner::new();
    for requirement in build_requirements(&descriptor.host, bash_path.as_deref()) {
        match requirement {
            BuildRequirement::Bash(path) => {
                if !path.is_file() {
                    anyhow::bail!("{BASH_PATH_ENV} points to {}, which does not exist", path.display());
                }
                runner = SystemRunner::with_bash(path);
            }
            BuildRequirement::Msys2Shell => {
                if !descriptor.is_msvc() {
                    warn!("{BASH_PATH_ENV} is not set; expecting an MSYS2 bash on PATH");
                }
            }
        }
    }
    Ok(runner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffpkg_build::{DependencyInfo, ToolInvocation, ToolOutput};
    use ffpkg_platform::{Arch, BuildHost, CompilerFamily, OperatingSystem};
    use std::cell::RefCell;
    use std::path::Path;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    /// `make install` drops a static library into the package.
    struct FakeMake {
        package: std::path::PathBuf,
        calls: RefCell<Vec<String>>,
    }

    impl CommandRunner for FakeMake {
        fn execute(&self, inv: &ToolInvocation) -> ffpkg_build::Result<ToolOutput> {
            self.calls.borrow_mut().push(inv.command_line());
            if inv.program == "make" && inv.args == ["install"] {
                touch(&self.package.join("lib/libffms2.a"));
            }
            Ok(ToolOutput::success())
        }
    }

    fn upstream(dir: &Path) -> std::path::PathBuf {
        let up = dir.join("ffms2-src");
        std::fs::create_dir_all(&up).unwrap();
        std::fs::write(up.join("configure.ac"), "AC_CONFIG_HEADERS([src/config/config.h])\n").unwrap();
        std::fs::write(up.join("Makefile.am"), "\t@ZLIB_CPPFLAGS@ \\\n\t-include config.h\n").unwrap();
        std::fs::write(up.join("COPYING.LIB"), "license\n").unwrap();
        up
    }

    #[test]
    fn build_from_local_tree() {
        let dir = tempfile::tempdir().unwrap();
        let locations = Locations {
            workdir: dir.path().join("build"),
            package_dir: dir.path().join("package"),
        };
        let recipe = RecipeConfig {
            dependency: DependencyInfo::ffmpeg().with_prefix(Path::new("/opt/ffmpeg")),
            ..RecipeConfig::default()
        };
        let descriptor = PlatformDescriptor::new(OperatingSystem::Linux, CompilerFamily::Gcc, Arch::X86_64)
            .with_host(BuildHost {
                os: OperatingSystem::Linux,
                subsystem: None,
            });
        let fetcher = fetcher(&SourceArgs {
            source_dir: Some(upstream(dir.path())),
            ..SourceArgs::default()
        });
        let runner = FakeMake {
            package: locations.package_dir.clone(),
            calls: RefCell::default(),
        };

        let report = run_with(&descriptor, &recipe, &locations, fetcher.as_ref(), &runner, true).unwrap();
        assert_eq!(report.libs, vec!["ffms2"]);
        assert!(report.tool_outcomes.is_empty());
        assert!(locations.package_dir.join("package.json").is_file());
        assert_eq!(runner.calls.borrow()[0], "autoreconf -vfi");
    }

    #[test]
    fn missing_dependency_paths_fail_configure() {
        let dir = tempfile::tempdir().unwrap();
        let locations = Locations {
            workdir: dir.path().join("build"),
            package_dir: dir.path().join("package"),
        };
        let descriptor = PlatformDescriptor::new(OperatingSystem::Linux, CompilerFamily::Gcc, Arch::X86_64);
        let fetcher = fetcher(&SourceArgs {
            source_dir: Some(upstream(dir.path())),
            ..SourceArgs::default()
        });
        let runner = FakeMake {
            package: locations.package_dir.clone(),
            calls: RefCell::default(),
        };

        let err = run_with(
            &descriptor,
            &RecipeConfig::default(),
            &locations,
            fetcher.as_ref(),
            &runner,
            true,
        )
        .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.starts_with("configuring"), "{msg}");
        assert!(msg.contains("ffmpeg"));
    }
}
