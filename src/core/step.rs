//! Step abstraction for release work
//!
//! Every unit of release work implements the [`Step`] trait. Steps are
//! constructed by the [`StepRegistry`](crate::core::registry::StepRegistry)
//! from a registered name, executed once, and may later be asked to undo
//! their work if a subsequent step fails.
//!
//! # Failure discipline
//!
//! Expected failures (a tag already exists, a build exits non-zero) are
//! reported as `Ok(StepResult::failure(..))`. An `Err` from `execute` is
//! reserved for unexpected problems. The release manager treats both the same
//! way: forward progress stops and rollback begins.
//!
//! # Example
//!
//! ```rust,ignore
//! use cosmosys::core::{Step, StepResult, ReleaseContext, CosmosysResult};
//!
//! struct Announce;
//!
//! impl Step for Announce {
//!   fn name(&self) -> &str {
//!     "announce"
//!   }
//!
//!   fn execute(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<StepResult> {
//!     if ctx.dry_run {
//!       ctx.log.info(self.name(), "Would announce the release");
//!       return Ok(StepResult::success("Simulated announcement"));
//!     }
//!     // ... post to chat ...
//!     Ok(StepResult::success("Announced"))
//!   }
//!
//!   fn rollback(&mut self, _ctx: &mut ReleaseContext) -> CosmosysResult<()> {
//!     Ok(())
//!   }
//! }
//! ```

use crate::core::context::ReleaseContext;
use crate::core::error::CosmosysResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declarative step reference from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
  /// Registered step name
  pub name: String,
  /// Optional gating expression (`${VAR:-default}`)
  pub condition: Option<String>,
}

impl StepSpec {
  /// Unconditional step
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      condition: None,
    }
  }

  /// Step gated by a condition
  pub fn when(name: impl Into<String>, condition: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      condition: Some(condition.into()),
    }
  }
}

/// What `execute` reports back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
  pub success: bool,
  pub message: String,
}

impl StepResult {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      success: true,
      message: message.into(),
    }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    Self {
      success: false,
      message: message.into(),
    }
  }
}

/// Lifecycle of one step instance within a run
///
/// ```text
/// Pending -> Executing -> Succeeded -> RollingBack -> RolledBack
///                     \-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
  Pending,
  Executing,
  Succeeded,
  Failed,
  RollingBack,
  RolledBack,
}

impl StepState {
  /// Whether moving from `self` to `next` is a legal transition
  pub fn can_transition_to(self, next: StepState) -> bool {
    matches!(
      (self, next),
      (StepState::Pending, StepState::Executing)
        | (StepState::Executing, StepState::Succeeded)
        | (StepState::Executing, StepState::Failed)
        | (StepState::Succeeded, StepState::RollingBack)
        | (StepState::RollingBack, StepState::RolledBack)
    )
  }

  /// No further transitions are possible for this run
  pub fn is_terminal(self) -> bool {
    matches!(self, StepState::Failed | StepState::RolledBack)
  }
}

impl fmt::Display for StepState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      StepState::Pending => "pending",
      StepState::Executing => "executing",
      StepState::Succeeded => "succeeded",
      StepState::Failed => "failed",
      StepState::RollingBack => "rolling back",
      StepState::RolledBack => "rolled back",
    };
    f.write_str(label)
  }
}

/// A unit of release work
///
/// Instances are single-use: `execute` is called at most once, and `rollback`
/// only after `execute` reported success. Steps run strictly one after another
/// and may freely read and update the shared [`ReleaseContext`].
pub trait Step {
  /// Registered name, used for logging and reporting
  fn name(&self) -> &str;

  /// Perform the work, or only log it when `ctx.dry_run` is set
  fn execute(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<StepResult>;

  /// Best-effort undo of a successful `execute`
  ///
  /// "Nothing to undo" is `Ok(())`. An `Err` becomes a rollback warning and
  /// does not stop the remaining rollbacks.
  fn rollback(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<()>;
}
