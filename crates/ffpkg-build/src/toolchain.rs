//! External tool invocation.
//!
//! Every process the recipe spawns (autoreconf, configure, make, cmake, the
//! system package managers) goes through a [`CommandRunner`], so the build
//! pipeline can be driven against a scripted runner in tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{BuildError, Result};

/// Lines of combined output kept in a `ToolFailed` error.
const OUTPUT_TAIL_LINES: usize = 40;

/// One command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// Run through `bash -lc` instead of directly.
    pub via_bash: bool,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            via_bash: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn via_bash(mut self, yes: bool) -> Self {
        self.via_bash = yes;
        self
    }

    /// The command as a single shell line. Arguments containing whitespace
    /// or quotes are single-quoted.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=./:@+,%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success() -> Self {
        Self {
            status: Some(0),
            ..Self::default()
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn succeeded(&self) -> bool {
        self.status == Some(0)
    }

    fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("exit status: {code}"),
            None => "signal".to_string(),
        }
    }

    /// Last lines of stdout followed by stderr.
    fn tail(&self) -> String {
        let lines: Vec<&str> = self.stdout.lines().chain(self.stderr.lines()).collect();
        let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
        lines[start..].join("\n")
    }
}

/// Runs external tools.
pub trait CommandRunner {
    /// Run `invocation` to completion and capture its output. Only fails if
    /// the process could not be started.
    fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;

    /// Run `invocation` and turn a non-zero exit into [`BuildError::ToolFailed`].
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        debug!(command = %invocation.command_line(), "running");
        let output = self.execute(invocation)?;
        if !output.succeeded() {
            return Err(BuildError::ToolFailed {
                tool: invocation.program.clone(),
                status: output.status_text(),
                output: output.tail(),
            });
        }
        Ok(output)
    }

    /// Whether `program` can be launched and answers `--version`.
    fn probe(&self, program: &str) -> bool {
        self.execute(&ToolInvocation::new(program).arg("--version"))
            .map(|o| o.succeeded())
            .unwrap_or(false)
    }
}

/// Runs tools as real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    /// Shell used for `via_bash` invocations; `bash` on `PATH` when unset.
    bash: Option<PathBuf>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bash(bash: impl Into<PathBuf>) -> Self {
        Self {
            bash: Some(bash.into()),
        }
    }

    fn bash(&self) -> &Path {
        self.bash.as_deref().unwrap_or(Path::new("bash"))
    }
}

impl CommandRunner for SystemRunner {
    fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let mut cmd = if invocation.via_bash {
            // A login shell may change directory in its profile (MSYS2 does
            // unless CHERE_INVOKING is set), so cd explicitly as well.
            let line = match &invocation.cwd {
                Some(dir) => format!(
                    "cd {} && {}",
                    shell_quote(&dir.to_string_lossy()),
                    invocation.command_line()
                ),
                None => invocation.command_line(),
            };
            let mut cmd = Command::new(self.bash());
            cmd.env("CHERE_INVOKING", "1").arg("-lc").arg(line);
            cmd
        } else {
            let mut cmd = Command::new(&invocation.program);
            cmd.args(&invocation.args);
            cmd
        };
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        cmd.envs(&invocation.env);

        let output = cmd.output().map_err(|source| BuildError::ToolLaunch {
            tool: invocation.program.clone(),
            source,
        })?;

        let result = ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.stdout.is_empty() {
            debug!(tool = %invocation.program, stdout = %result.stdout.trim_end());
        }
        if !result.stderr.is_empty() {
            debug!(tool = %invocation.program, stderr = %result.stderr.trim_end());
        }
        Ok(result)
    }
}
