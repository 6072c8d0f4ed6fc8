//! Error types for cosmosys with contextual messages and exit codes
//!
//! A single error type categorises everything that can abort a command before
//! or around a release run. Step failures during a run are *not* errors: they
//! are reported through `ReleaseOutcome` so the rollback coordinator can act on
//! them. Every categorised error carries an optional help message.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::core::condition::ConditionSyntaxError;

/// Exit codes for cosmosys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, unknown step, bad condition, invalid args)
  User = 1,
  /// System error (git, I/O, process spawning)
  System = 2,
  /// Plugin discovery or registration failed
  Plugin = 3,
  /// A release step failed (regardless of rollback result)
  ReleaseFailed = 4,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for cosmosys
#[derive(Debug)]
pub enum CosmosysError {
  /// Configuration errors
  Config(ConfigError),

  /// Pipeline build errors (registry and condition validation)
  Pipeline(PipelineError),

  /// Git operation errors
  Git(GitError),

  /// Plugin loading errors
  Plugin(PluginError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl CosmosysError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    CosmosysError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    CosmosysError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  ///
  /// Categorised errors are converted into a message so the context is not lost.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      CosmosysError::Message { message, context, help } => CosmosysError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      CosmosysError::Io(e) => CosmosysError::Message {
        message: format!("I/O error: {}", e),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      CosmosysError::Config(_) => ExitCode::User,
      CosmosysError::Pipeline(_) => ExitCode::User,
      CosmosysError::Git(_) => ExitCode::System,
      CosmosysError::Plugin(_) => ExitCode::Plugin,
      CosmosysError::Io(_) => ExitCode::System,
      CosmosysError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      CosmosysError::Config(e) => e.help_message(),
      CosmosysError::Pipeline(e) => e.help_message(),
      CosmosysError::Git(e) => e.help_message(),
      CosmosysError::Plugin(e) => e.help_message(),
      CosmosysError::Message { help, .. } => help.clone(),
      CosmosysError::Io(_) => None,
    }
  }
}

impl fmt::Display for CosmosysError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CosmosysError::Config(e) => write!(f, "{}", e),
      CosmosysError::Pipeline(e) => write!(f, "{}", e),
      CosmosysError::Git(e) => write!(f, "{}", e),
      CosmosysError::Plugin(e) => write!(f, "{}", e),
      CosmosysError::Io(e) => write!(f, "I/O error: {}", e),
      CosmosysError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for CosmosysError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      CosmosysError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for CosmosysError {
  fn from(err: io::Error) -> Self {
    CosmosysError::Io(err)
  }
}

impl From<String> for CosmosysError {
  fn from(msg: String) -> Self {
    CosmosysError::message(msg)
  }
}

impl From<&str> for CosmosysError {
  fn from(msg: &str) -> Self {
    CosmosysError::message(msg)
  }
}

impl From<PipelineError> for CosmosysError {
  fn from(err: PipelineError) -> Self {
    CosmosysError::Pipeline(err)
  }
}

impl From<ConfigError> for CosmosysError {
  fn from(err: ConfigError) -> Self {
    CosmosysError::Config(err)
  }
}

impl From<GitError> for CosmosysError {
  fn from(err: GitError) -> Self {
    CosmosysError::Git(err)
  }
}

impl From<PluginError> for CosmosysError {
  fn from(err: PluginError) -> Self {
    CosmosysError::Plugin(err)
  }
}

impl From<toml_edit::TomlError> for CosmosysError {
  fn from(err: toml_edit::TomlError) -> Self {
    CosmosysError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for CosmosysError {
  fn from(err: toml_edit::de::Error) -> Self {
    CosmosysError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for CosmosysError {
  fn from(err: serde_json::Error) -> Self {
    CosmosysError::message(format!("JSON error: {}", err))
  }
}

impl From<semver::Error> for CosmosysError {
  fn from(err: semver::Error) -> Self {
    CosmosysError::message(format!("Invalid semantic version: {}", err))
  }
}

impl From<regex::Error> for CosmosysError {
  fn from(err: regex::Error) -> Self {
    CosmosysError::message(format!("Regex error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for CosmosysError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    CosmosysError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// Plugin authors may build steps on `anyhow`
impl From<anyhow::Error> for CosmosysError {
  fn from(err: anyhow::Error) -> Self {
    CosmosysError::message(format!("{:#}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// cosmosys.toml not found
  NotFound { search_root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// Key lookup in the raw document failed
  KeyNotFound { key: String },

  /// A field holds a value we cannot use
  InvalidValue { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Run `cosmosys config --init` to create a configuration file, or pass --config.".to_string())
      }
      ConfigError::KeyNotFound { .. } => {
        Some("Use dot notation for nested keys, e.g. `project.version`.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { search_root } => {
        write!(
          f,
          "No cosmosys configuration found.\nExpected file: {}/cosmosys.toml",
          search_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::KeyNotFound { key } => write!(f, "Configuration key '{}' not found", key),
      ConfigError::InvalidValue { field, reason } => {
        write!(f, "Invalid value for '{}': {}", field, reason)
      }
    }
  }
}

/// Errors raised while populating the registry or building a release plan.
///
/// All of these are fatal and surface before any step executes.
#[derive(Debug)]
pub enum PipelineError {
  /// A configured step name has no registry entry
  UnknownStep { name: String, available: Vec<String> },

  /// Two registrations claimed the same step name
  DuplicateStep { name: String },

  /// A step condition could not be parsed
  ConditionSyntax { step: String, error: ConditionSyntaxError },
}

impl PipelineError {
  fn help_message(&self) -> Option<String> {
    match self {
      PipelineError::UnknownStep { available, .. } => {
        if available.is_empty() {
          Some("No steps are registered. Check plugin loading.".to_string())
        } else {
          Some(format!("Registered steps: {}", available.join(", ")))
        }
      }
      PipelineError::DuplicateStep { .. } => {
        Some("Rename the plugin step; built-in step names cannot be overridden.".to_string())
      }
      PipelineError::ConditionSyntax { .. } => {
        Some("Conditions use `${VAR}` or `${VAR:-default}`.".to_string())
      }
    }
  }
}

impl fmt::Display for PipelineError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PipelineError::UnknownStep { name, .. } => write!(f, "Unknown release step: {}", name),
      PipelineError::DuplicateStep { name } => {
        write!(f, "Release step '{}' is already registered", name)
      }
      PipelineError::ConditionSyntax { step, error } => {
        write!(f, "Invalid condition for step '{}': {}", step, error)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Push failed
  PushFailed { remote: String, reference: String, reason: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") || reason.contains("rejected") {
          Some("The remote rejected the push. Fetch and inspect the remote state first.".to_string())
        } else if reason.contains("permission denied") || reason.contains("403") {
          Some("Check your credentials for the remote.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { path } => Some(format!(
        "Initialize the repository first or check the path: {}",
        path.display()
      )),
      GitError::CommandFailed { .. } => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::PushFailed {
        remote,
        reference,
        reason,
      } => {
        write!(f, "Push of {} to {} failed: {}", reference, remote, reason.trim_end())
      }
    }
  }
}

/// Plugin loading errors
#[derive(Debug)]
pub enum PluginError {
  /// Plugin directory exists but could not be read
  DirectoryUnreadable { path: PathBuf, reason: String },

  /// A command plugin declared no command
  EmptyCommand { name: String },
}

impl PluginError {
  fn help_message(&self) -> Option<String> {
    match self {
      PluginError::DirectoryUnreadable { .. } => {
        Some("Check `plugins.directory` in cosmosys.toml and its permissions.".to_string())
      }
      PluginError::EmptyCommand { name } => Some(format!(
        "Give [plugins.steps.{}] a non-empty `command` array.",
        name
      )),
    }
  }
}

impl fmt::Display for PluginError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PluginError::DirectoryUnreadable { path, reason } => {
        write!(f, "Cannot read plugin directory {}: {}", path.display(), reason)
      }
      PluginError::EmptyCommand { name } => write!(f, "Plugin step '{}' has an empty command", name),
    }
  }
}

/// Result type alias for cosmosys
pub type CosmosysResult<T> = Result<T, CosmosysError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> CosmosysResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> CosmosysResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<CosmosysError>,
{
  fn context(self, ctx: impl Into<String>) -> CosmosysResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> CosmosysResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &CosmosysError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
