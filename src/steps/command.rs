//! Steps that run an external command
//!
//! Used by the build and publish built-ins and by command plugins. Arguments
//! may contain `{version}` and `{name}`; the command also receives the release
//! as `COSMOSYS_*` environment variables.

use crate::core::context::{LogLevel, ReleaseContext};
use crate::core::error::{CosmosysError, CosmosysResult};
use crate::core::process::ProcessCommand;
use crate::core::step::{Step, StepResult};
use std::fs;

/// What rolling back a command step does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackAction {
  /// Nothing to undo
  Nothing,
  /// Run a compensating command
  Command(ProcessCommand),
  /// Delete build outputs (relative to the project root)
  RemovePaths(Vec<String>),
  /// The effect cannot be undone; reported as a rollback warning
  Irreversible(String),
}

/// Run a command as a release step
pub struct CommandStep {
  name: String,
  command: ProcessCommand,
  rollback: RollbackAction,
}

impl CommandStep {
  pub fn new(name: impl Into<String>, command: ProcessCommand) -> Self {
    Self {
      name: name.into(),
      command,
      rollback: RollbackAction::Nothing,
    }
  }

  pub fn with_rollback(mut self, rollback: RollbackAction) -> Self {
    self.rollback = rollback;
    self
  }

  fn prepare(&self, ctx: &ReleaseContext, command: &ProcessCommand) -> ProcessCommand {
    let mut prepared = ProcessCommand::new(ctx.render(&command.program));
    prepared.args = command.args.iter().map(|a| ctx.render(a)).collect();
    prepared.envs = command.envs.clone();
    prepared
      .env("COSMOSYS_STEP", self.name.clone())
      .env("COSMOSYS_PROJECT", ctx.project.name.clone())
      .env("COSMOSYS_VERSION", ctx.release_version())
      .env("COSMOSYS_CURRENT_VERSION", ctx.project.current_version.clone())
      .env("COSMOSYS_DRY_RUN", if ctx.dry_run { "1" } else { "0" })
      .env("COSMOSYS_ROOT", ctx.root.display().to_string())
  }

  /// Command output is shown only with `--verbose`
  fn log_output(&self, ctx: &mut ReleaseContext, stdout: &str) {
    let level = if ctx.verbose { LogLevel::Info } else { LogLevel::Debug };
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
      ctx.log.step(level, &self.name, line.to_string());
    }
  }
}

impl Step for CommandStep {
  fn name(&self) -> &str {
    &self.name
  }

  fn execute(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<StepResult> {
    let command = self.prepare(ctx, &self.command);

    if ctx.dry_run {
      ctx.log.info(&self.name, format!("Would run `{}`", command));
      return Ok(StepResult::success(format!("Would run `{}`", command)));
    }

    ctx.log.info(&self.name, format!("Running `{}`", command));
    let output = ctx.run_command(&command)?;
    self.log_output(ctx, &output.stdout);

    if !output.success {
      return Ok(StepResult::failure(format!("`{}` failed: {}", command, output.summary())));
    }

    Ok(StepResult::success(format!("Ran `{}`", command)))
  }

  fn rollback(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<()> {
    match &self.rollback {
      RollbackAction::Nothing => {
        ctx.log.debug(&self.name, "Nothing to roll back");
        Ok(())
      }
      RollbackAction::Command(undo) => {
        let undo = self.prepare(ctx, undo);
        if ctx.dry_run {
          ctx.log.info(&self.name, format!("Would run `{}`", undo));
          return Ok(());
        }
        ctx.log.info(&self.name, format!("Running `{}`", undo));
        let output = ctx.run_command(&undo)?;
        if !output.success {
          return Err(CosmosysError::message(format!("`{}` failed: {}", undo, output.summary())));
        }
        Ok(())
      }
      RollbackAction::RemovePaths(paths) => {
        for path in paths {
          let full = ctx.path(path);
          if !full.exists() {
            continue;
          }
          if ctx.dry_run {
            ctx.log.info(&self.name, format!("Would remove {}", path));
            continue;
          }
          let removed = if full.is_dir() {
            fs::remove_dir_all(&full)
          } else {
            fs::remove_file(&full)
          };
          removed.map_err(|e| CosmosysError::message(format!("Failed to remove {}: {}", path, e)))?;
          ctx.log.info(&self.name, format!("Removed {}", path));
        }
        Ok(())
      }
      RollbackAction::Irreversible(reason) => Err(CosmosysError::message(reason.clone())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::CosmosysConfig;
  use crate::core::process::ProcessOutput;
  use crate::core::process::testing::RecordingRunner;
  use std::path::Path;
  use std::sync::Arc;

  fn ctx(root: &Path, runner: Arc<RecordingRunner>) -> ReleaseContext {
    let config = CosmosysConfig::parse("[project]\nname = \"demo\"\nversion = \"1.0.0\"\n").unwrap();
    let mut ctx = ReleaseContext::new(Arc::new(config), root).with_runner(runner);
    ctx.project.target_version = Some(semver::Version::new(1, 1, 0));
    ctx
  }

  #[test]
  fn test_placeholders_and_environment() {
    let runner = Arc::new(RecordingRunner::new());
    let mut ctx = ctx(Path::new("/tmp"), runner.clone());
    let mut step = CommandStep::new("announce", ProcessCommand::new("echo").args(["{name}", "{version}"]));

    let result = step.execute(&mut ctx).unwrap();
    assert!(result.success);
    assert_eq!(runner.commands(), vec!["echo demo 1.1.0"]);
  }

  #[test]
  fn test_nonzero_exit_is_step_failure() {
    let runner = Arc::new(RecordingRunner::with_responder(|_| ProcessOutput::failed(101, "error: could not compile")));
    let mut ctx = ctx(Path::new("/tmp"), runner);
    let mut step = CommandStep::new("build_rust", ProcessCommand::new("cargo").args(["build", "--release"]));

    let result = step.execute(&mut ctx).unwrap();
    assert!(!result.success);
    assert!(result.message.contains("could not compile"));
  }

  #[test]
  fn test_output_level_follows_verbose() {
    let output_levels = |verbose: bool| {
      let runner = Arc::new(RecordingRunner::with_responder(|_| ProcessOutput::ok("Compiling demo\n\nFinished\n")));
      let mut ctx = ctx(Path::new("/tmp"), runner).with_verbose(verbose);
      CommandStep::new("build_rust", ProcessCommand::new("cargo").arg("build"))
        .execute(&mut ctx)
        .unwrap();
      let levels: Vec<LogLevel> = ctx
        .log
        .entries()
        .iter()
        .filter(|e| e.message == "Compiling demo" || e.message == "Finished")
        .map(|e| e.level)
        .collect();
      levels
    };

    assert_eq!(output_levels(false), vec![LogLevel::Debug, LogLevel::Debug]);
    assert_eq!(output_levels(true), vec![LogLevel::Info, LogLevel::Info]);
  }

  #[test]
  fn test_dry_run_runs_nothing() {
    let runner = Arc::new(RecordingRunner::new());
    let mut ctx = ctx(Path::new("/tmp"), runner.clone()).with_dry_run(true);
    let mut step = CommandStep::new("publish_npm", ProcessCommand::new("npm").arg("publish"));

    assert!(step.execute(&mut ctx).unwrap().success);
    assert!(runner.commands().is_empty());
    assert_eq!(ctx.log.messages_for("publish_npm"), vec!["Would run `npm publish`"]);
  }

  #[test]
  fn test_rollback_actions() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("dist")).unwrap();
    fs::write(dir.path().join("dist/app.js"), "x").unwrap();
    let runner = Arc::new(RecordingRunner::new());
    let mut ctx = ctx(dir.path(), runner.clone());

    let mut build = CommandStep::new("build_node", ProcessCommand::new("npm"))
      .with_rollback(RollbackAction::RemovePaths(vec!["dist".to_string(), "build".to_string()]));
    build.rollback(&mut ctx).unwrap();
    assert!(!dir.path().join("dist").exists());

    let mut undo = CommandStep::new("deploy", ProcessCommand::new("deploy"))
      .with_rollback(RollbackAction::Command(ProcessCommand::new("undeploy").arg("{version}")));
    undo.rollback(&mut ctx).unwrap();
    assert_eq!(runner.commands(), vec!["undeploy 1.1.0"]);

    let mut publish = CommandStep::new("publish_npm", ProcessCommand::new("npm"))
      .with_rollback(RollbackAction::Irreversible("cannot unpublish".to_string()));
    assert!(publish.rollback(&mut ctx).is_err());
  }
}
