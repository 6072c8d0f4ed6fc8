//! Shared state for one release run
//!
//! A [`ReleaseContext`] is built once by the `release` command and handed
//! mutably to every step in turn. It carries the resolved configuration, the
//! project identity and target version, the dry-run flag, the run log, and the
//! stack of steps that completed and may need rolling back.

use crate::core::config::CosmosysConfig;
use crate::core::git::Git;
use crate::core::process::{ProcessCommand, ProcessOutput, ProcessRunner, SystemRunner};
use crate::core::error::CosmosysResult;
use crate::core::step::Step;
use crate::release::version::VersionRequest;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Project identity and the version being released
#[derive(Debug, Clone)]
pub struct ProjectInfo {
  pub name: String,
  /// Version recorded in the configuration before this run
  pub current_version: String,
  /// Set by the version_update step once computed
  pub target_version: Option<semver::Version>,
}

/// Severity of a run log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Debug,
  Info,
  Success,
  Warning,
  Error,
}

/// One line of the run log
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
  pub level: LogLevel,
  /// Originating step; `None` for release manager messages
  #[serde(skip_serializing_if = "Option::is_none")]
  pub step: Option<String>,
  pub message: String,
}

/// Run log
///
/// Entries are kept for the final report and forwarded to `tracing` as they
/// are recorded.
#[derive(Debug, Default, Clone)]
pub struct ReleaseLog {
  entries: Vec<LogEntry>,
}

impl ReleaseLog {
  pub fn debug(&mut self, step: &str, message: impl Into<String>) {
    self.record(LogLevel::Debug, Some(step), message.into());
  }

  pub fn info(&mut self, step: &str, message: impl Into<String>) {
    self.record(LogLevel::Info, Some(step), message.into());
  }

  pub fn success(&mut self, step: &str, message: impl Into<String>) {
    self.record(LogLevel::Success, Some(step), message.into());
  }

  pub fn warn(&mut self, step: &str, message: impl Into<String>) {
    self.record(LogLevel::Warning, Some(step), message.into());
  }

  pub fn error(&mut self, step: &str, message: impl Into<String>) {
    self.record(LogLevel::Error, Some(step), message.into());
  }

  /// Step message at a level chosen at runtime
  pub fn step(&mut self, level: LogLevel, step: &str, message: impl Into<String>) {
    self.record(level, Some(step), message.into());
  }

  /// Message from the release manager itself
  pub fn pipeline(&mut self, level: LogLevel, message: impl Into<String>) {
    self.record(level, None, message.into());
  }

  pub fn entries(&self) -> &[LogEntry] {
    &self.entries
  }

  /// Messages recorded by one step, in order
  pub fn messages_for(&self, step: &str) -> Vec<&str> {
    self
      .entries
      .iter()
      .filter(|e| e.step.as_deref() == Some(step))
      .map(|e| e.message.as_str())
      .collect()
  }

  fn record(&mut self, level: LogLevel, step: Option<&str>, message: String) {
    let step_field = step.unwrap_or("release");
    match level {
      LogLevel::Debug => tracing::debug!(step = step_field, "{}", message),
      LogLevel::Info | LogLevel::Success => tracing::info!(step = step_field, "{}", message),
      LogLevel::Warning => tracing::warn!(step = step_field, "{}", message),
      LogLevel::Error => tracing::error!(step = step_field, "{}", message),
    }

    self.entries.push(LogEntry {
      level,
      step: step.map(String::from),
      message,
    });
  }
}

/// A step that completed successfully in this run
pub struct ExecutedStep {
  /// Position in the release plan
  pub index: usize,
  pub name: String,
  pub step: Box<dyn Step>,
}

/// Mutable state shared by all steps of a release
pub struct ReleaseContext {
  pub project: ProjectInfo,

  /// Resolved configuration (`cosmosys.toml`)
  pub config: Arc<CosmosysConfig>,

  /// File the configuration was loaded from, if any
  pub config_path: Option<PathBuf>,

  /// Project root; relative paths in the configuration resolve against it
  pub root: PathBuf,

  /// How the next version is chosen (`--new-version` / `--part`)
  pub version_request: VersionRequest,

  /// Simulate every step without side effects
  pub dry_run: bool,

  /// Surface external command output at info level
  pub verbose: bool,

  pub log: ReleaseLog,

  runner: Arc<dyn ProcessRunner>,
  executed: Vec<ExecutedStep>,
}

impl ReleaseContext {
  /// Context for `config` rooted at `root`, using the system process runner
  pub fn new(config: Arc<CosmosysConfig>, root: &Path) -> Self {
    Self {
      project: ProjectInfo {
        name: config.project.name.clone(),
        current_version: config.project.version.clone(),
        target_version: None,
      },
      config,
      config_path: None,
      root: root.to_path_buf(),
      version_request: VersionRequest::default(),
      dry_run: false,
      verbose: false,
      log: ReleaseLog::default(),
      runner: Arc::new(SystemRunner),
      executed: Vec::new(),
    }
  }

  pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.config_path = Some(path.into());
    self
  }

  pub fn with_dry_run(mut self, dry_run: bool) -> Self {
    self.dry_run = dry_run;
    self
  }

  pub fn with_verbose(mut self, verbose: bool) -> Self {
    self.verbose = verbose;
    self
  }

  pub fn with_version_request(mut self, request: VersionRequest) -> Self {
    self.version_request = request;
    self
  }

  /// Replace the process runner (tests use a recording runner)
  pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
    self.runner = runner;
    self
  }

  /// Version string for templates: the target if known, else the current one
  pub fn release_version(&self) -> String {
    match &self.project.target_version {
      Some(v) => v.to_string(),
      None => self.project.current_version.clone(),
    }
  }

  /// Substitute `{version}` and `{name}` in a template
  pub fn render(&self, template: &str) -> String {
    template
      .replace("{version}", &self.release_version())
      .replace("{name}", &self.project.name)
  }

  /// Resolve a configuration-relative path
  pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
    self.root.join(relative)
  }

  pub fn git(&self) -> Git {
    Git::new(self.runner.clone(), &self.root)
  }

  pub fn runner(&self) -> Arc<dyn ProcessRunner> {
    self.runner.clone()
  }

  /// Run an external command in the project root
  pub fn run_command(&self, command: &ProcessCommand) -> CosmosysResult<ProcessOutput> {
    self.runner.run(&self.root, command)
  }

  pub(crate) fn push_executed(&mut self, index: usize, name: &str, step: Box<dyn Step>) {
    self.executed.push(ExecutedStep {
      index,
      name: name.to_string(),
      step,
    });
  }

  /// Most recently completed step (LIFO)
  pub(crate) fn pop_executed(&mut self) -> Option<ExecutedStep> {
    self.executed.pop()
  }

  /// Release finished; nothing left to roll back
  pub(crate) fn commit_executed(&mut self) {
    self.executed.clear();
  }

  /// Names of completed steps, oldest first
  pub fn executed_names(&self) -> Vec<&str> {
    self.executed.iter().map(|e| e.name.as_str()).collect()
  }
}
