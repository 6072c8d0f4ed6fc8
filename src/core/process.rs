//! External process boundary
//!
//! Every side effect that leaves the process (git, cargo, npm, twine, plugin
//! executables) goes through a [`ProcessRunner`]. The system runner spawns real
//! processes; tests substitute a recording runner to prove what was (or was
//! not) executed.

use crate::core::error::{CosmosysError, CosmosysResult};
use std::fmt;
use std::path::Path;
use std::process::Command;

/// A program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
  pub program: String,
  pub args: Vec<String>,
  pub envs: Vec<(String, String)>,
}

impl ProcessCommand {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      envs: Vec::new(),
    }
  }

  /// Build from an argv-style vector (`["cargo", "publish"]`)
  pub fn from_argv(argv: &[String]) -> Option<Self> {
    let (program, args) = argv.split_first()?;
    Some(Self::new(program.clone()).args(args.iter().cloned()))
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

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.envs.push((key.into(), value.into()));
    self
  }
}

impl fmt::Display for ProcessCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      if arg.is_empty() || arg.contains(char::is_whitespace) {
        write!(f, " {:?}", arg)?;
      } else {
        write!(f, " {}", arg)?;
      }
    }
    Ok(())
  }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
  pub success: bool,
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl ProcessOutput {
  /// Successful output with the given stdout
  pub fn ok(stdout: impl Into<String>) -> Self {
    Self {
      success: true,
      code: Some(0),
      stdout: stdout.into(),
      stderr: String::new(),
    }
  }

  /// Failed output with the given stderr
  pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
    Self {
      success: false,
      code: Some(code),
      stdout: String::new(),
      stderr: stderr.into(),
    }
  }

  /// Last non-empty line of stderr (or stdout), for short failure messages
  pub fn summary(&self) -> String {
    let pick = |s: &str| s.lines().rev().find(|l| !l.trim().is_empty()).map(|l| l.trim().to_string());
    pick(&self.stderr)
      .or_else(|| pick(&self.stdout))
      .unwrap_or_else(|| match self.code {
        Some(code) => format!("exited with status {}", code),
        None => "terminated by signal".to_string(),
      })
  }
}

/// Executes external programs
pub trait ProcessRunner {
  /// Run `command` in `cwd` and wait for it
  ///
  /// A non-zero exit is *not* an error here; only failure to spawn is.
  fn run(&self, cwd: &Path, command: &ProcessCommand) -> CosmosysResult<ProcessOutput>;
}

/// Runner that spawns real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
  fn run(&self, cwd: &Path, command: &ProcessCommand) -> CosmosysResult<ProcessOutput> {
    tracing::debug!(cwd = %cwd.display(), "exec: {}", command);

    let output = Command::new(&command.program)
      .args(&command.args)
      .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
      .current_dir(cwd)
      .output()
      .map_err(|e| {
        CosmosysError::with_help(
          format!("Failed to run '{}': {}", command.program, e),
          format!("Make sure '{}' is installed and on PATH.", command.program),
        )
      })?;

    Ok(ProcessOutput {
      success: output.status.success(),
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
  }
}
