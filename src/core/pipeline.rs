//! Release manager: planning, sequential execution and rollback
//!
//! # Architecture
//!
//! ```text
//! StepSpec list ──plan()──> ReleasePlan ──execute()──> ReleaseOutcome
//!                  │                        │
//!                  ├─ parse every condition ├─ create + execute, in order
//!                  ├─ reject unknown names  ├─ push successes on the context stack
//!                  └─ evaluate conditions   └─ on failure: pop + rollback (LIFO)
//! ```
//!
//! Everything that can be rejected is rejected by `plan`, before any step has
//! been constructed, so a malformed release never has side effects.

use crate::core::condition::Condition;
use crate::core::context::{LogLevel, ReleaseContext};
use crate::core::environment::Environment;
use crate::core::error::PipelineError;
use crate::core::registry::StepRegistry;
use crate::core::step::{StepSpec, StepState};
use serde::Serialize;

/// Why a planned step will or will not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Inclusion {
  Included,
  /// Condition evaluated to false
  SkippedByCondition,
  /// Removed by the user before execution (interactive mode)
  Deselected,
}

/// A step spec after validation and condition evaluation
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
  pub spec: StepSpec,
  pub inclusion: Inclusion,
}

impl PlannedStep {
  pub fn is_included(&self) -> bool {
    self.inclusion == Inclusion::Included
  }
}

/// Validated, ordered release plan
#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
  pub steps: Vec<PlannedStep>,
}

impl ReleasePlan {
  /// Steps that will run, in order
  pub fn included(&self) -> impl Iterator<Item = &PlannedStep> {
    self.steps.iter().filter(|s| s.is_included())
  }

  /// Exclude the step at `index`; returns false if it was not included
  pub fn deselect(&mut self, index: usize) -> bool {
    match self.steps.get_mut(index) {
      Some(step) if step.is_included() => {
        step.inclusion = Inclusion::Deselected;
        true
      }
      _ => false,
    }
  }
}

/// The step that stopped the release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
  pub step: String,
  pub message: String,
}

/// A rollback that could not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackWarning {
  pub step: String,
  pub message: String,
}

/// Final state of one planned step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
  pub name: String,
  pub inclusion: Inclusion,
  pub state: StepState,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

/// Result of a release run
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseOutcome {
  pub succeeded: bool,
  pub dry_run: bool,
  pub failed_step: Option<String>,
  pub failure: Option<StepFailure>,
  /// Steps that executed successfully, in order
  pub executed_steps: Vec<String>,
  /// Steps excluded by condition or deselection
  pub skipped_steps: Vec<String>,
  /// Steps whose rollback was attempted, in rollback order
  pub rolled_back_steps: Vec<String>,
  pub rollback_warnings: Vec<RollbackWarning>,
  pub steps: Vec<StepReport>,
}

/// Sequential driver for a release
pub struct ReleaseManager<'r> {
  registry: &'r StepRegistry,
}

impl<'r> ReleaseManager<'r> {
  pub fn new(registry: &'r StepRegistry) -> Self {
    Self { registry }
  }

  /// Validate `specs` and decide which steps run
  ///
  /// Every condition is parsed and every name resolved, including those of
  /// steps that end up skipped.
  pub fn plan(&self, specs: &[StepSpec], env: &Environment) -> Result<ReleasePlan, PipelineError> {
    let mut conditions = Vec::with_capacity(specs.len());
    for spec in specs {
      let condition = spec
        .condition
        .as_deref()
        .map(Condition::parse)
        .transpose()
        .map_err(|error| PipelineError::ConditionSyntax {
          step: spec.name.clone(),
          error,
        })?;
      conditions.push(condition);
    }

    if let Some(unknown) = specs.iter().find(|s| !self.registry.contains(&s.name)) {
      return Err(self.registry.unknown(&unknown.name));
    }

    let steps = specs
      .iter()
      .zip(conditions)
      .map(|(spec, condition)| {
        let included = condition.map(|c| c.evaluate(env)).unwrap_or(true);
        PlannedStep {
          spec: spec.clone(),
          inclusion: if included {
            Inclusion::Included
          } else {
            Inclusion::SkippedByCondition
          },
        }
      })
      .collect();

    Ok(ReleasePlan { steps })
  }

  /// Plan and execute in one go
  pub fn run(
    &self,
    specs: &[StepSpec],
    env: &Environment,
    ctx: &mut ReleaseContext,
  ) -> Result<ReleaseOutcome, PipelineError> {
    let plan = self.plan(specs, env)?;
    Ok(self.execute(&plan, ctx))
  }

  /// Execute a plan, rolling back completed steps if one fails
  pub fn execute(&self, plan: &ReleasePlan, ctx: &mut ReleaseContext) -> ReleaseOutcome {
    let mut outcome = ReleaseOutcome {
      succeeded: true,
      dry_run: ctx.dry_run,
      failed_step: None,
      failure: None,
      executed_steps: Vec::new(),
      skipped_steps: Vec::new(),
      rolled_back_steps: Vec::new(),
      rollback_warnings: Vec::new(),
      steps: plan
        .steps
        .iter()
        .map(|p| StepReport {
          name: p.spec.name.clone(),
          inclusion: p.inclusion,
          state: StepState::Pending,
          message: None,
        })
        .collect(),
    };

    let total = plan.included().count();
    ctx.log.pipeline(
      LogLevel::Info,
      format!(
        "Starting release of {} {} ({} step(s){})",
        ctx.project.name,
        ctx.project.current_version,
        total,
        if ctx.dry_run { ", dry run" } else { "" }
      ),
    );

    let mut position = 0;
    for (index, planned) in plan.steps.iter().enumerate() {
      let name = planned.spec.name.as_str();
      if !planned.is_included() {
        ctx.log.pipeline(LogLevel::Debug, format!("Skipping {} ({:?})", name, planned.inclusion));
        outcome.skipped_steps.push(name.to_string());
        continue;
      }

      position += 1;
      advance(&mut outcome.steps[index], StepState::Executing);
      ctx.log.pipeline(LogLevel::Info, format!("[{}/{}] ▶ {}", position, total, name));

      let result = self
        .registry
        .create(name, ctx)
        .and_then(|mut step| step.execute(ctx).map(|result| (step, result)));

      match result {
        Ok((step, result)) if result.success => {
          advance(&mut outcome.steps[index], StepState::Succeeded);
          outcome.steps[index].message = Some(result.message.clone());
          ctx.log.pipeline(LogLevel::Success, format!("[{}/{}] ✔ {}: {}", position, total, name, result.message));
          ctx.push_executed(index, name, step);
          outcome.executed_steps.push(name.to_string());
        }
        Ok((_, result)) => {
          fail(&mut outcome, ctx, index, name, result.message);
          break;
        }
        Err(error) => {
          fail(&mut outcome, ctx, index, name, error.to_string());
          break;
        }
      }
    }

    if outcome.succeeded {
      ctx.commit_executed();
      ctx.log.pipeline(
        LogLevel::Success,
        format!("Release of {} {} completed", ctx.project.name, ctx.release_version()),
      );
    } else {
      rollback(&mut outcome, ctx);
    }

    outcome
  }
}

fn fail(outcome: &mut ReleaseOutcome, ctx: &mut ReleaseContext, index: usize, name: &str, message: String) {
  advance(&mut outcome.steps[index], StepState::Failed);
  outcome.steps[index].message = Some(message.clone());
  ctx.log.pipeline(LogLevel::Error, format!("✘ {} failed: {}", name, message));

  outcome.succeeded = false;
  outcome.failed_step = Some(name.to_string());
  outcome.failure = Some(StepFailure {
    step: name.to_string(),
    message,
  });
}

/// Unwind the execution stack, newest first; every rollback is attempted
fn rollback(outcome: &mut ReleaseOutcome, ctx: &mut ReleaseContext) {
  let pending = ctx.executed_names().len();
  if pending == 0 {
    ctx.log.pipeline(LogLevel::Info, "Nothing to roll back");
    return;
  }

  ctx.log.pipeline(LogLevel::Warning, format!("Rolling back {} step(s)", pending));

  while let Some(mut executed) = ctx.pop_executed() {
    let report = &mut outcome.steps[executed.index];
    advance(report, StepState::RollingBack);

    match executed.step.rollback(ctx) {
      Ok(()) => ctx.log.pipeline(LogLevel::Info, format!("↩ {} rolled back", executed.name)),
      Err(error) => {
        let message = error.to_string();
        ctx.log.pipeline(
          LogLevel::Warning,
          format!("Rollback of {} failed: {}", executed.name, message),
        );
        outcome.rollback_warnings.push(RollbackWarning {
          step: executed.name.clone(),
          message,
        });
      }
    }

    advance(&mut outcome.steps[executed.index], StepState::RolledBack);
    outcome.rolled_back_steps.push(executed.name);
  }

  ctx.log.pipeline(
    LogLevel::Warning,
    format!(
      "Rollback finished: {} step(s) rolled back, {} warning(s)",
      outcome.rolled_back_steps.len(),
      outcome.rollback_warnings.len()
    ),
  );
}

fn advance(report: &mut StepReport, next: StepState) {
  debug_assert!(
    report.state.can_transition_to(next),
    "illegal transition for {}: {} -> {}",
    report.name,
    report.state,
    next
  );
  report.state = next;
}
