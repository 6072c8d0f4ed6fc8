//! cosmosys: ordered, conditional release steps with dry-run and rollback
//!
//! A release is a list of named steps from `cosmosys.toml`. Each step is
//! looked up in a [`StepRegistry`], gated by an optional `${VAR}` condition
//! and executed in order by the [`ReleaseManager`]. When a step fails, the
//! steps that already succeeded are rolled back in reverse order.
//!
//! ```no_run
//! use cosmosys::{Environment, ReleaseContext, ReleaseManager, StepRegistry};
//! use cosmosys::core::config::CosmosysConfig;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> cosmosys::CosmosysResult<()> {
//! let config = CosmosysConfig::load(Path::new("cosmosys.toml"))?;
//! let registry = StepRegistry::with_builtin_steps()?;
//! let env = Environment::from_process().with_defaults(&config.release.variables);
//! let specs = config.step_specs();
//!
//! let mut ctx = ReleaseContext::new(Arc::new(config), Path::new(".")).with_dry_run(true);
//! let outcome = ReleaseManager::new(&registry).run(&specs, &env, &mut ctx)?;
//! assert!(outcome.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod logging;
pub mod plugins;
pub mod release;
pub mod steps;

pub use crate::core::{
  CosmosysError, CosmosysResult, Environment, ReleaseContext, ReleaseManager, ReleaseOutcome, ReleasePlan, Step,
  StepRegistry, StepResult, StepSpec,
};
pub use crate::plugins::{Plugin, PluginManager};
