//! CLI commands for cosmosys
//!
//! - **release**: Plan, run and report a release
//! - **config**: Show, read, write or initialise `cosmosys.toml`
//! - **plugins**: List loaded plugins or show one of them
//! - **steps**: List every registered step and where it came from
//!
//! Commands only present results; the engine lives in the library.

pub mod config;
pub mod plugins;
pub mod release;
pub mod steps;

pub use config::run_config;
pub use plugins::run_plugins;
pub use release::{ReleaseArgs, run_release};
pub use steps::run_steps;

use cosmosys::core::config::CosmosysConfig;
use cosmosys::core::error::CosmosysResult;
use cosmosys::core::registry::StepRegistry;
use cosmosys::plugins::PluginManager;
use std::env;
use std::path::PathBuf;

/// Options shared by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalOptions {
  /// Explicit `--config` path
  pub config: Option<PathBuf>,
  pub verbose: bool,
}

/// Configuration loaded for one command invocation
pub struct Session {
  /// Project root (the working directory)
  pub root: PathBuf,
  pub config_path: PathBuf,
  pub config: CosmosysConfig,
}

impl GlobalOptions {
  /// Resolve and load the configuration file
  pub fn session(&self) -> CosmosysResult<Session> {
    let root = env::current_dir()?;
    let config_path = CosmosysConfig::resolve_path(self.config.as_deref(), &root)?;
    tracing::debug!("using configuration {}", config_path.display());
    let config = CosmosysConfig::load(&config_path)?;
    Ok(Session {
      root,
      config_path,
      config,
    })
  }
}

impl Session {
  /// Built-in steps plus every plugin, in load order
  pub fn registry(&self) -> CosmosysResult<(StepRegistry, PluginManager)> {
    let mut registry = StepRegistry::with_builtin_steps()?;
    let mut plugins = PluginManager::new();
    plugins.load(&mut registry, &self.config, &self.root)?;
    Ok((registry, plugins))
  }
}
