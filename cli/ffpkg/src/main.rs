//! ffpkg: builds the FFMS2 library for a target platform and packages it.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{Locations, SourceArgs, TargetArgs};
use manifest::FfpkgManifest;

#[derive(Parser)]
#[command(name = "ffpkg", version, about = "Build and package FFMS2 for a target platform")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, configure, build and package
    Build {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        paths: PathArgs,
        #[command(flatten)]
        source: SourceArgs,
        /// Skip installing missing autotools packages
        #[arg(long)]
        skip_sysreq: bool,
    },
    /// Show the strategy, configuration and commands a build would run
    Plan {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        paths: PathArgs,
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Fetch and patch the upstream source only
    Source {
        #[command(flatten)]
        paths: PathArgs,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Check the build host and its tools
    Doctor {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Remove the working directory
    Clean {
        #[command(flatten)]
        paths: PathArgs,
        /// Also remove the package directory
        #[arg(long)]
        all: bool,
    },
    /// Manage platform profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

/// Directory overrides shared by several commands.
#[derive(Args, Default)]
struct PathArgs {
    /// Working directory for source and build trees
    #[arg(long)]
    workdir: Option<PathBuf>,
    /// Package output directory
    #[arg(long)]
    package_dir: Option<PathBuf>,
    /// FFmpeg install prefix (with include/ and lib/)
    #[arg(long)]
    ffmpeg_prefix: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List built-in and project profiles
    List,
    /// Show a profile
    Describe {
        /// Profile name or .profile.toml path
        name: String,
        /// Output format (default: human-readable, "toml" for TOML)
        #[arg(long)]
        format: Option<String>,
    },
    /// Check a profile for unbuildable combinations
    Validate {
        /// Profile name or .profile.toml path
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => "ffpkg=info",
        1 => "ffpkg=debug",
        _ => "ffpkg=trace",
    };
    // Target matching is by prefix, so this also covers the ffpkg_* crates.
    let filter = EnvFilter::from_default_env().add_directive(level.parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (manifest, project_dir) = load_manifest(&cwd)?;

    match cli.command {
        Commands::Build {
            target,
            paths,
            source,
            skip_sysreq,
        } => {
            let descriptor = commands::resolve_descriptor(&target, &project_dir, &manifest)?;
            let recipe = recipe_for(&manifest, &project_dir, &paths);
            let locations = locations_for(&manifest, &project_dir, &paths);
            commands::build::run(&descriptor, &recipe, &locations, &source, skip_sysreq)
        }

        Commands::Plan { target, paths, format } => {
            let descriptor = commands::resolve_descriptor(&target, &project_dir, &manifest)?;
            let recipe = recipe_for(&manifest, &project_dir, &paths);
            let locations = locations_for(&manifest, &project_dir, &paths);
            commands::plan::run(&descriptor, &recipe, &locations, &format)
        }

        Commands::Source { paths, source } => {
            let recipe = recipe_for(&manifest, &project_dir, &paths);
            let locations = locations_for(&manifest, &project_dir, &paths);
            commands::source::run(&recipe, &locations, &source)
        }

        Commands::Doctor { target } => {
            let descriptor = commands::resolve_descriptor(&target, &project_dir, &manifest)?;
            commands::doctor::run(&project_dir, &descriptor)
        }

        Commands::Clean { paths, all } => {
            let locations = locations_for(&manifest, &project_dir, &paths);
            commands::clean::run(&locations, all)
        }

        Commands::Profile { action } => match action {
            ProfileAction::List => commands::profile::list(&project_dir),
            ProfileAction::Describe { name, format } => {
                commands::profile::describe(&name, &project_dir, format.as_deref())
            }
            ProfileAction::Validate { name } => commands::profile::validate(&name, &project_dir),
        },
    }
}

/// Load `ffpkg.toml` from the current directory upward. Without one, the
/// defaults apply and the current directory is the project directory.
fn load_manifest(cwd: &Path) -> anyhow::Result<(FfpkgManifest, PathBuf)> {
    match FfpkgManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((manifest, dir)),
        None => Ok((FfpkgManifest::default(), cwd.to_path_buf())),
    }
}

fn recipe_for(manifest: &FfpkgManifest, project_dir: &Path, paths: &PathArgs) -> ffpkg_build::RecipeConfig {
    let mut recipe = manifest.recipe(project_dir);
    if let Some(prefix) = &paths.ffmpeg_prefix {
        recipe.dependency = recipe.dependency.with_prefix(&project_dir.join(prefix));
    }
    recipe
}

fn locations_for(manifest: &FfpkgManifest, project_dir: &Path, paths: &PathArgs) -> Locations {
    Locations {
        workdir: match &paths.workdir {
            Some(dir) => project_dir.join(dir),
            None => manifest.workdir(project_dir),
        },
        package_dir: match &paths.package_dir {
            Some(dir) => project_dir.join(dir),
            None => manifest.package_dir(project_dir),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_manifest() {
        let manifest = FfpkgManifest::from_str("[paths]\nworkdir = \"w\"\npackage = \"p\"\n").unwrap();
        let project = Path::new("/proj");

        let defaults = locations_for(&manifest, project, &PathArgs::default());
        assert_eq!(defaults.workdir, Path::new("/proj/w"));
        assert_eq!(defaults.package_dir, Path::new("/proj/p"));

        let paths = PathArgs {
            workdir: Some("/tmp/work".into()),
            package_dir: None,
            ffmpeg_prefix: Some("ffmpeg".into()),
        };
        let locations = locations_for(&manifest, project, &paths);
        assert_eq!(locations.workdir, Path::new("/tmp/work"));
        assert_eq!(locations.package_dir, Path::new("/proj/p"));

        let recipe = recipe_for(&manifest, project, &paths);
        assert_eq!(recipe.dependency.include_dir(), Some(Path::new("/proj/ffmpeg/include")));
    }

    #[test]
    fn parses_build_invocation() {
        let cli = Cli::try_parse_from([
            "ffpkg",
            "-v",
            "build",
            "--os",
            "windows",
            "--compiler",
            "gcc",
            "--arch",
            "x86_64",
            "--ffmpeg-prefix",
            "/opt/ffmpeg",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Build { target, paths, .. } => {
                assert_eq!(target.os.as_deref(), Some("windows"));
                assert_eq!(paths.ffmpeg_prefix.as_deref(), Some(Path::new("/opt/ffmpeg")));
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn parses_source_flags() {
        let cli = Cli::try_parse_from(["ffpkg", "source", "--keep-archive", "--source-dir", "up"]).unwrap();
        match cli.command {
            Commands::Source { source, .. } => {
                assert!(source.keep_archive);
                assert_eq!(source.source_dir.as_deref(), Some(Path::new("up")));
            }
            _ => panic!("expected source"),
        }
    }
}
