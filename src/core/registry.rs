//! Name -> constructor registry for release steps
//!
//! Built-in steps and plugin steps register here under unique names. The
//! release manager looks names up when planning and constructs a fresh step
//! instance for every execution.

use crate::core::context::ReleaseContext;
use crate::core::error::{CosmosysResult, PipelineError};
use crate::core::step::Step;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Builds a step instance for one run
pub type StepConstructor = Box<dyn Fn(&ReleaseContext) -> CosmosysResult<Box<dyn Step>>>;

/// Where a registration came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "source")]
pub enum StepOrigin {
  Builtin,
  /// Declared under `[plugins.steps]`
  ConfigPlugin,
  /// Executable found in the plugin directory
  DirectoryPlugin(String),
  /// Registered through the library API
  Custom,
}

impl fmt::Display for StepOrigin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StepOrigin::Builtin => write!(f, "builtin"),
      StepOrigin::ConfigPlugin => write!(f, "config plugin"),
      StepOrigin::DirectoryPlugin(path) => write!(f, "plugin {}", path),
      StepOrigin::Custom => write!(f, "custom"),
    }
  }
}

/// Metadata about a registered step
#[derive(Debug, Clone, Serialize)]
pub struct StepInfo {
  pub name: String,
  pub description: String,
  pub origin: StepOrigin,
}

struct Registration {
  info: StepInfo,
  constructor: StepConstructor,
}

/// Registry of available steps
#[derive(Default)]
pub struct StepRegistry {
  steps: BTreeMap<String, Registration>,
}

impl StepRegistry {
  /// Empty registry
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry pre-populated with the built-in steps
  pub fn with_builtin_steps() -> Result<Self, PipelineError> {
    let mut registry = Self::new();
    crate::steps::register_builtin_steps(&mut registry)?;
    Ok(registry)
  }

  /// Register a step under `name`
  ///
  /// Names are unique; registering an existing name fails with
  /// `DuplicateStep` and leaves the first registration in place.
  pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> Result<(), PipelineError>
  where
    F: Fn(&ReleaseContext) -> CosmosysResult<Box<dyn Step>> + 'static,
  {
    let name = name.into();
    self.register_described(name, "", StepOrigin::Custom, constructor)
  }

  /// Register a step with a description and origin for listings
  pub fn register_described<F>(
    &mut self,
    name: impl Into<String>,
    description: impl Into<String>,
    origin: StepOrigin,
    constructor: F,
  ) -> Result<(), PipelineError>
  where
    F: Fn(&ReleaseContext) -> CosmosysResult<Box<dyn Step>> + 'static,
  {
    let name = name.into();
    if self.steps.contains_key(&name) {
      return Err(PipelineError::DuplicateStep { name });
    }

    tracing::debug!(step = %name, origin = %origin, "registered step");
    self.steps.insert(
      name.clone(),
      Registration {
        info: StepInfo {
          name,
          description: description.into(),
          origin,
        },
        constructor: Box::new(constructor),
      },
    );
    Ok(())
  }

  /// Construct a fresh instance of a registered step
  pub fn create(&self, name: &str, ctx: &ReleaseContext) -> CosmosysResult<Box<dyn Step>> {
    let registration = self.steps.get(name).ok_or_else(|| self.unknown(name))?;
    (registration.constructor)(ctx)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.steps.contains_key(name)
  }

  pub fn info(&self, name: &str) -> Option<&StepInfo> {
    self.steps.get(name).map(|r| &r.info)
  }

  /// Registered names, sorted
  pub fn names(&self) -> Vec<String> {
    self.steps.keys().cloned().collect()
  }

  /// All registrations, sorted by name
  pub fn iter(&self) -> impl Iterator<Item = &StepInfo> {
    self.steps.values().map(|r| &r.info)
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub(crate) fn unknown(&self, name: &str) -> PipelineError {
    PipelineError::UnknownStep {
      name: name.to_string(),
      available: self.names(),
    }
  }
}
