//! Subprocess execution of composed programs.
//!
//! Each executor owns a disposable scratch directory; the source file name
//! inside it is stable per language across the attempts of one session,
//! but two sessions never share a path. Every toolchain invocation is
//! bounded by a kill-on-deadline timeout so a hung candidate cannot
//! outlive its session.

use crate::language::LanguageVariant;
use crate::util::{run_command_with_timeout, CommandRunResult};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

/// Outcome of one subprocess run. Produced fresh per run, never mutated.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn ok(stdout: String) -> Self {
        Self {
            success: true,
            stdout,
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: String) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr,
        }
    }

    /// The message fed back to the repair oracle: stderr when present,
    /// otherwise whatever the process printed, otherwise a fixed note.
    pub fn diagnostic(&self) -> &str {
        if !self.stderr.trim().is_empty() {
            &self.stderr
        } else if !self.stdout.trim().is_empty() {
            &self.stdout
        } else {
            "process produced no output"
        }
    }
}

/// Seam between the repair loop and the toolchains, so loop semantics can
/// be tested without spawning processes.
pub trait Runner {
    fn run(&self, variant: LanguageVariant, code: &str) -> ExecutionResult;
}

/// Runs composed programs inside a per-session temporary directory.
pub struct SandboxedExecutor {
    scratch: TempDir,
    command_timeout: Duration,
}

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(20);

impl SandboxedExecutor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            scratch: TempDir::new().context("failed to create scratch directory")?,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        })
    }

    pub fn with_command_timeout(timeout: Duration) -> Result<Self> {
        let mut executor = Self::new()?;
        executor.command_timeout = timeout;
        Ok(executor)
    }

    /// Stable per-language source path inside the scratch directory. Java
    /// is special: the composed harness declares `public class Test`, and
    /// javac requires the file name to match.
    fn source_path(&self, variant: LanguageVariant) -> PathBuf {
        let file_name = match variant {
            LanguageVariant::Java => "Test.java".to_string(),
            other => format!("candidate.{}", other.extension()),
        };
        self.scratch.path().join(file_name)
    }

    fn run_stage(&self, command: &mut Command) -> Result<CommandRunResult> {
        run_command_with_timeout(command, self.command_timeout)
    }

    fn execute(&self, variant: LanguageVariant, code: &str) -> Result<ExecutionResult> {
        let source = self.source_path(variant);
        fs::write(&source, code)
            .with_context(|| format!("failed to write {}", source.display()))?;

        match variant {
            LanguageVariant::Python => {
                let run = self.run_stage(Command::new("python3").arg(&source))?;
                Ok(finish(run))
            }
            LanguageVariant::JavaScript => {
                let run = self.run_stage(Command::new("node").arg(&source))?;
                Ok(finish(run))
            }
            LanguageVariant::Cpp => {
                let binary = self.scratch.path().join("candidate.out");
                let compile =
                    self.run_stage(Command::new("g++").arg(&source).arg("-o").arg(&binary))?;
                if !compile.succeeded() {
                    return Ok(finish(compile));
                }
                let run = self.run_stage(&mut Command::new(&binary))?;
                Ok(finish(run))
            }
            LanguageVariant::Java => {
                let compile = self.run_stage(Command::new("javac").arg(&source))?;
                if !compile.succeeded() {
                    return Ok(finish(compile));
                }
                let run = self.run_stage(
                    Command::new("java")
                        .arg("-cp")
                        .arg(self.scratch.path())
                        .arg("Test"),
                )?;
                Ok(finish(run))
            }
            LanguageVariant::Unknown => Ok(ExecutionResult::failed(
                "unsupported language: cannot execute".to_string(),
            )),
        }
    }
}

fn finish(run: CommandRunResult) -> ExecutionResult {
    if run.timed_out {
        return ExecutionResult::failed("execution timed out and was killed".to_string());
    }
    if run.succeeded() {
        ExecutionResult::ok(run.stdout)
    } else if run.stderr.trim().is_empty() {
        ExecutionResult::failed(run.stdout)
    } else {
        ExecutionResult::failed(run.stderr)
    }
}

impl Runner for SandboxedExecutor {
    fn run(&self, variant: LanguageVariant, code: &str) -> ExecutionResult {
        if variant == LanguageVariant::Unknown {
            // No filesystem write, no process spawn.
            return ExecutionResult::failed("unsupported language: cannot execute".to_string());
        }
        match self.execute(variant, code) {
            Ok(result) => result,
            Err(err) => ExecutionResult::failed(format!("{err:#}")),
        }
    }
}
