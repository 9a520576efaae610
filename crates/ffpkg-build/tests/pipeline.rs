//! End-to-end pipeline runs against a local upstream tree and a scripted
//! toolchain.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use ffpkg_build::{
    BuildError, BuildOrchestrator, BuildStrategy, CommandRunner, DependencyInfo, FailureKind, RecipeConfig, Stage,
    ToolInvocation, ToolOutput,
};
use ffpkg_platform::{Arch, BuildHost, CompilerFamily, OperatingSystem, PlatformDescriptor, Subsystem};
use ffpkg_source::{LocalTreeFetcher, SOURCE_SUBFOLDER};

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"x").unwrap();
}

fn upstream(root: &Path) -> PathBuf {
    let up = root.join("upstream");
    std::fs::create_dir_all(up.join("src/core")).unwrap();
    std::fs::write(
        up.join("configure.ac"),
        "AC_INIT([ffms2], [2.31])\nAC_CONFIG_HEADERS([src/config/config.h])\nAC_PROG_CXX\n",
    )
    .unwrap();
    std::fs::write(
        up.join("Makefile.am"),
        "AM_CPPFLAGS = \\\n\t-I. \\\n\t@ZLIB_CPPFLAGS@ \\\n\t-include config.h\n",
    )
    .unwrap();
    std::fs::write(up.join("COPYING.LIB"), "MIT License\n").unwrap();
    std::fs::write(up.join("src/core/ffms.cpp"), "// ffms\n").unwrap();
    up
}

fn recipe() -> RecipeConfig {
    RecipeConfig {
        dependency: DependencyInfo::ffmpeg().with_prefix(Path::new("/deps/ffmpeg")),
        ..RecipeConfig::default()
    }
}

/// Pretends to be autotools and CMake: every command succeeds, and the
/// install and build steps leave behind the files a real toolchain would.
struct ScriptedToolchain {
    package_dir: PathBuf,
    build_dir: PathBuf,
    fail_on: Option<&'static str>,
    calls: RefCell<Vec<ToolInvocation>>,
}

impl ScriptedToolchain {
    fn new(work: &Path, package_dir: &Path) -> Self {
        Self {
            package_dir: package_dir.to_path_buf(),
            build_dir: work.join("build_subfolder"),
            fail_on: None,
            calls: RefCell::default(),
        }
    }

    fn failing_on(mut self, program: &'static str) -> Self {
        self.fail_on = Some(program);
        self
    }

    fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToolInvocation::command_line).collect()
    }

    fn find(&self, prefix: &str) -> Option<ToolInvocation> {
        self.calls
            .borrow()
            .iter()
            .find(|inv| inv.command_line().starts_with(prefix))
            .cloned()
    }
}

impl CommandRunner for ScriptedToolchain {
    fn execute(&self, inv: &ToolInvocation) -> ffpkg_build::Result<ToolOutput> {
        self.calls.borrow_mut().push(inv.clone());
        if self.fail_on == Some(inv.program.as_str()) {
            return Ok(ToolOutput::failure(2, "src/core/track.cpp:12: error: expected ';'"));
        }
        let args: Vec<&str> = inv.args.iter().map(String::as_str).collect();
        match (inv.program.as_str(), args.as_slice()) {
            ("make", ["install"]) => {
                touch(&self.package_dir.join("lib/libffms2.a"));
                touch(&self.package_dir.join("lib/libffms2.la"));
                touch(&self.package_dir.join("include/ffms.h"));
            }
            ("cmake", ["--build", ..]) => {
                touch(&self.build_dir.join("Release/ffms2.dll"));
            }
            ("cmake", ["--install", ..]) => {
                touch(&self.package_dir.join("bin/ffms2.dll"));
                touch(&self.package_dir.join("lib/ffms2.lib"));
                touch(&self.package_dir.join("include/ffms.h"));
            }
            _ => {}
        }
        Ok(ToolOutput::success().with_stdout("ok"))
    }
}

fn linux_host() -> BuildHost {
    BuildHost {
        os: OperatingSystem::Linux,
        subsystem: None,
    }
}

fn windows_host() -> BuildHost {
    BuildHost {
        os: OperatingSystem::Windows,
        subsystem: Some(Subsystem::Msys2),
    }
}

#[test]
fn linux_gcc_builds_static_library_with_autotools() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let pkg = dir.path().join("package");
    let recipe = recipe();
    let fetcher = LocalTreeFetcher::new(upstream(dir.path()));
    let tools = ScriptedToolchain::new(&work, &pkg);
    let descriptor =
        PlatformDescriptor::new(OperatingSystem::Linux, CompilerFamily::Gcc, Arch::X86_64).with_host(linux_host());

    let mut orch = BuildOrchestrator::new(descriptor, &recipe, &fetcher, &tools, &work, &pkg);
    let report = orch.run().unwrap();

    assert_eq!(orch.stage(), Stage::Packaged);
    assert_eq!(report.strategy, BuildStrategy::Autotools);
    assert_eq!(report.host_triplet, None);
    assert_eq!(report.libs, vec!["ffms2"]);
    assert_eq!(report.stages.len(), 4);

    assert!(pkg.join("lib/libffms2.a").is_file());
    assert!(!pkg.join("lib/libffms2.la").exists());
    assert!(!pkg.join("bin").exists());
    assert!(pkg.join("licenses/COPYING.LIB").is_file());
    assert!(pkg.join("package.json").is_file());

    let source = work.join(SOURCE_SUBFOLDER);
    assert!(source.join("CMakeLists.txt").is_file());
    let configure_ac = std::fs::read_to_string(source.join("configure.ac")).unwrap();
    assert!(!configure_ac.contains("AC_CONFIG_HEADERS"));

    let lines = tools.lines();
    let build_steps: Vec<&String> = lines.iter().filter(|l| !l.ends_with("--version")).collect();
    assert_eq!(build_steps[0], "autoreconf -vfi");
    assert!(build_steps[1].starts_with("sh ./configure --prefix="));
    assert!(build_steps[1].ends_with("--enable-static --disable-shared"));
    assert!(build_steps[2].starts_with("make -j"));
    assert_eq!(build_steps[3], "make install");

    let configure = tools.find("sh ./configure").unwrap();
    assert_eq!(configure.cwd.as_deref(), Some(source.as_path()));
    assert_eq!(configure.env["FFMPEG_LIBS"], "-L/deps/ffmpeg/lib");
    assert_eq!(configure.env["FFMPEG_CFLAGS"], "-I/deps/ffmpeg/include");
    assert!(configure.env["CFLAGS"].contains("-fPIC"));
    assert!(!configure.via_bash);
}

#[test]
fn windows_msvc_builds_dll_with_cmake() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let pkg = dir.path().join("package");
    let recipe = recipe();
    let fetcher = LocalTreeFetcher::new(upstream(dir.path()));
    let tools = ScriptedToolchain::new(&work, &pkg);
    let descriptor =
        PlatformDescriptor::new(OperatingSystem::Windows, CompilerFamily::Msvc, Arch::X86_64).with_host(windows_host());

    let mut orch = BuildOrchestrator::new(descriptor, &recipe, &fetcher, &tools, &work, &pkg);
    let report = orch.run().unwrap();

    assert_eq!(report.strategy, BuildStrategy::NativeBuildSystem);
    assert!(report.tool_outcomes.is_empty());
    assert_eq!(report.libs, vec!["ffms2"]);
    assert!(pkg.join("bin/ffms2.dll").is_file());
    assert!(pkg.join("lib/ffms2.lib").is_file());
    assert!(work.join(SOURCE_SUBFOLDER).join("buildinfo.cmake").is_file());

    let lines = tools.lines();
    assert!(lines.iter().all(|l| !l.starts_with("autoreconf") && !l.starts_with("make")));
    assert!(lines[0].starts_with("cmake -S "));
    assert!(lines[0].ends_with("-A x64"));
    assert!(lines[1].starts_with("cmake --build "));
    assert!(lines[2].starts_with("cmake --install "));
}

#[test]
fn mingw_x86_64_cross_configures_host_triplet() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let pkg = dir.path().join("package");
    let recipe = recipe();
    let fetcher = LocalTreeFetcher::new(upstream(dir.path()));
    let tools = ScriptedToolchain::new(&work, &pkg);
    let descriptor =
        PlatformDescriptor::new(OperatingSystem::Windows, CompilerFamily::Gcc, Arch::X86_64).with_host(windows_host());

    let mut orch = BuildOrchestrator::new(descriptor, &recipe, &fetcher, &tools, &work, &pkg);
    let report = orch.run().unwrap();

    assert_eq!(report.strategy, BuildStrategy::Autotools);
    assert_eq!(report.host_triplet.as_deref(), Some("x86_64-w64-mingw32"));

    let configure = tools.find("sh ./configure").unwrap();
    assert!(configure.args.contains(&"--host=x86_64-w64-mingw32".to_string()));
    assert!(!configure.args.iter().any(|a| a.starts_with("--build")));
    assert!(configure.via_bash);
    assert!(!configure.args[1].contains('\\'));
    assert!(!configure.env["CFLAGS"].contains("-fPIC"));
}

#[test]
fn unreachable_source_stops_before_source_prepared() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let pkg = dir.path().join("package");
    touch(&pkg.join("package.json"));
    let recipe = recipe();
    let fetcher = LocalTreeFetcher::new(dir.path().join("nowhere"));
    let tools = ScriptedToolchain::new(&work, &pkg);
    let descriptor =
        PlatformDescriptor::new(OperatingSystem::Linux, CompilerFamily::Gcc, Arch::X86_64).with_host(linux_host());

    let mut orch = BuildOrchestrator::new(descriptor, &recipe, &fetcher, &tools, &work, &pkg);
    let err = orch.run().unwrap_err();

    assert_eq!(err.kind(), FailureKind::Fetch);
    assert_eq!(orch.stage(), Stage::Failed(FailureKind::Fetch));
    assert!(orch.source_tree().is_none());
    assert!(!work.join(SOURCE_SUBFOLDER).exists());
    assert!(!pkg.join("package.json").exists());
}

#[test]
fn failing_make_reports_build_error_with_output() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let pkg = dir.path().join("package");
    let recipe = recipe();
    let fetcher = LocalTreeFetcher::new(upstream(dir.path()));
    let tools = ScriptedToolchain::new(&work, &pkg).failing_on("make");
    let descriptor =
        PlatformDescriptor::new(OperatingSystem::Linux, CompilerFamily::Gcc, Arch::X86_64).with_host(linux_host());

    let mut orch = BuildOrchestrator::new(descriptor, &recipe, &fetcher, &tools, &work, &pkg);
    orch.prepare_source().unwrap();
    orch.configure().unwrap();
    let err = orch.build().map(|_| ()).unwrap_err();

    match &err {
        BuildError::ToolFailed { tool, output, .. } => {
            assert_eq!(tool, "make");
            assert!(output.contains("track.cpp"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(orch.stage(), Stage::Failed(FailureKind::Build));
    assert!(!pkg.join("package.json").exists());
}

#[test]
fn stages_must_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let pkg = dir.path().join("package");
    let recipe = recipe();
    let fetcher = LocalTreeFetcher::new(upstream(dir.path()));
    let tools = ScriptedToolchain::new(&work, &pkg);
    let descriptor =
        PlatformDescriptor::new(OperatingSystem::Linux, CompilerFamily::Gcc, Arch::X86_64).with_host(linux_host());

    let mut orch = BuildOrchestrator::new(descriptor, &recipe, &fetcher, &tools, &work, &pkg);
    orch.prepare_source().unwrap();

    let err = orch.package().map(|_| ()).unwrap_err();
    assert!(matches!(
        err,
        BuildError::InvalidTransition {
            stage: Stage::SourcePrepared,
            ..
        }
    ));
    assert_eq!(orch.stage(), Stage::SourcePrepared);

    let err = orch.prepare_source().map(|_| ()).unwrap_err();
    assert!(matches!(err, BuildError::InvalidTransition { .. }));
    assert_eq!(orch.stage(), Stage::SourcePrepared);
    assert!(tools.lines().is_empty());
}
