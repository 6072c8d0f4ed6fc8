//! Plugin loading
//!
//! Plugins add steps to the [`StepRegistry`] in an explicit loading phase
//! that runs after the built-ins are registered and before any release is
//! planned:
//!
//! 1. command plugins declared under `[plugins.steps.<name>]`
//! 2. executables in `plugins.directory` (default `plugins/`)
//!
//! Library users implement [`Plugin`] and call [`PluginManager::install`].
//!
//! # Directory plugins
//!
//! Every file in the plugin directory whose name does not start with `.` or
//! `_` becomes a step named after the file stem. The step runs
//! `<file> execute`, and `<file> rollback` when a later step fails. The
//! release is passed through `COSMOSYS_*` environment variables
//! (`COSMOSYS_VERSION`, `COSMOSYS_PROJECT`, `COSMOSYS_DRY_RUN`, ...). The
//! first `#` comment after the shebang is used as the description.

use crate::core::config::{CommandPluginConfig, CosmosysConfig};
use crate::core::error::{CosmosysError, CosmosysResult, PluginError};
use crate::core::process::ProcessCommand;
use crate::core::registry::{StepOrigin, StepRegistry};
use crate::core::step::Step;
use crate::steps::{CommandStep, RollbackAction};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A bundle of steps registered in one go
pub trait Plugin {
  fn name(&self) -> &str;

  fn description(&self) -> &str;

  /// Add this plugin's steps; name clashes are `DuplicateStep` errors
  fn register(&self, registry: &mut StepRegistry) -> CosmosysResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
  Command,
  Directory,
  Library,
}

/// What `plugins --list/--info` shows
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
  pub name: String,
  pub description: String,
  pub kind: PluginKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<PathBuf>,
  /// Steps this plugin registered
  pub steps: Vec<String>,
}

/// Step declared in `[plugins.steps.<name>]`
pub struct CommandPlugin {
  name: String,
  config: CommandPluginConfig,
}

impl CommandPlugin {
  pub fn new(name: impl Into<String>, config: CommandPluginConfig) -> Self {
    Self {
      name: name.into(),
      config,
    }
  }
}

impl Plugin for CommandPlugin {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    self.config.description.as_deref().unwrap_or("")
  }

  fn register(&self, registry: &mut StepRegistry) -> CosmosysResult<()> {
    let command = ProcessCommand::from_argv(&self.config.command).ok_or_else(|| PluginError::EmptyCommand {
      name: self.name.clone(),
    })?;
    let rollback = match ProcessCommand::from_argv(&self.config.rollback) {
      Some(undo) => RollbackAction::Command(undo),
      None => RollbackAction::Nothing,
    };

    let name = self.name.clone();
    let description = match &self.config.description {
      Some(d) => d.clone(),
      None => command.to_string(),
    };
    registry.register_described(self.name.clone(), description, StepOrigin::ConfigPlugin, move |_| {
      let step = CommandStep::new(name.clone(), command.clone()).with_rollback(rollback.clone());
      Ok(Box::new(step) as Box<dyn Step>)
    })?;
    Ok(())
  }
}

/// Executable found in the plugin directory
#[derive(Debug, Clone)]
pub struct DirectoryPlugin {
  name: String,
  path: PathBuf,
  description: String,
}

impl DirectoryPlugin {
  /// Inspect a plugin file; the step name is the file stem
  pub fn from_path(path: &Path) -> Option<Self> {
    let file_name = path.file_name()?.to_str()?;
    if file_name.starts_with('.') || file_name.starts_with('_') {
      return None;
    }
    let name = path.file_stem()?.to_str()?.to_string();
    let description = fs::read(path)
      .map(|bytes| header_comment(&String::from_utf8_lossy(&bytes)))
      .unwrap_or_default();

    Some(Self {
      name,
      path: path.to_path_buf(),
      description,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Plugin for DirectoryPlugin {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    &self.description
  }

  fn register(&self, registry: &mut StepRegistry) -> CosmosysResult<()> {
    let program = self.path.display().to_string();
    let name = self.name.clone();
    let execute = ProcessCommand::new(program.clone()).arg("execute");
    let rollback = RollbackAction::Command(ProcessCommand::new(program.clone()).arg("rollback"));

    registry.register_described(
      self.name.clone(),
      self.description.clone(),
      StepOrigin::DirectoryPlugin(program),
      move |_| {
        let step = CommandStep::new(name.clone(), execute.clone()).with_rollback(rollback.clone());
        Ok(Box::new(step) as Box<dyn Step>)
      },
    )?;
    Ok(())
  }
}

/// First `#` comment after an optional shebang
fn header_comment(source: &str) -> String {
  source
    .lines()
    .filter(|l| !l.starts_with("#!"))
    .map(str::trim)
    .find(|l| !l.is_empty())
    .and_then(|l| l.strip_prefix('#'))
    .map(|l| l.trim_start_matches('#').trim().to_string())
    .unwrap_or_default()
}

/// List plugin files in `dir`, sorted by file name
///
/// A missing directory means no plugins.
pub fn discover(dir: &Path) -> CosmosysResult<Vec<DirectoryPlugin>> {
  if !dir.exists() {
    return Ok(Vec::new());
  }

  let entries = fs::read_dir(dir).map_err(|e| PluginError::DirectoryUnreadable {
    path: dir.to_path_buf(),
    reason: e.to_string(),
  })?;

  let mut paths: Vec<PathBuf> = entries
    .filter_map(Result::ok)
    .map(|e| e.path())
    .filter(|p| p.is_file())
    .collect();
  paths.sort();

  let mut plugins = Vec::new();
  for path in paths {
    let Some(plugin) = DirectoryPlugin::from_path(&path) else {
      continue;
    };
    if !is_executable(&path) {
      tracing::warn!(plugin = %plugin.name, "skipping {}: not executable", path.display());
      continue;
    }
    plugins.push(plugin);
  }
  Ok(plugins)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;
  fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
  true
}

/// Tracks which plugins were loaded and what they registered
#[derive(Debug, Default)]
pub struct PluginManager {
  plugins: Vec<PluginInfo>,
}

impl PluginManager {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load config plugins, then directory plugins
  pub fn load(&mut self, registry: &mut StepRegistry, config: &CosmosysConfig, root: &Path) -> CosmosysResult<()> {
    for (name, plugin_config) in &config.plugins.steps {
      let plugin = CommandPlugin::new(name.clone(), plugin_config.clone());
      self.track(&plugin, PluginKind::Command, None, registry)?;
    }

    let dir = root.join(&config.plugins.directory);
    for plugin in discover(&dir)? {
      let source = plugin.path().to_path_buf();
      self.track(&plugin, PluginKind::Directory, Some(source), registry)?;
    }

    tracing::debug!(count = self.plugins.len(), "plugins loaded");
    Ok(())
  }

  /// Register a library plugin
  pub fn install(&mut self, plugin: &dyn Plugin, registry: &mut StepRegistry) -> CosmosysResult<()> {
    self.track(plugin, PluginKind::Library, None, registry)
  }

  pub fn plugins(&self) -> &[PluginInfo] {
    &self.plugins
  }

  pub fn get(&self, name: &str) -> Option<&PluginInfo> {
    self.plugins.iter().find(|p| p.name == name)
  }

  fn track(
    &mut self,
    plugin: &dyn Plugin,
    kind: PluginKind,
    source: Option<PathBuf>,
    registry: &mut StepRegistry,
  ) -> CosmosysResult<()> {
    let before = registry.names();
    plugin
      .register(registry)
      .map_err(|e| plugin_failure(plugin.name(), e))?;
    let steps = registry.names().into_iter().filter(|n| !before.contains(n)).collect();

    self.plugins.push(PluginInfo {
      name: plugin.name().to_string(),
      description: plugin.description().to_string(),
      kind,
      source,
      steps,
    });
    Ok(())
  }
}

fn plugin_failure(name: &str, error: CosmosysError) -> CosmosysError {
  match error {
    // Keep the category so the exit code stays meaningful
    CosmosysError::Pipeline(_) | CosmosysError::Plugin(_) => error,
    other => other.context(format!("Failed to load plugin '{}'", name)),
  }
}
