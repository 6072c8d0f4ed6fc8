//! `git_commit`: commit the release changes

use crate::core::context::ReleaseContext;
use crate::core::error::CosmosysResult;
use crate::core::step::{Step, StepResult};

pub const NAME: &str = "git_commit";

#[derive(Default)]
pub struct GitCommitStep {
  /// HEAD before the release commit (`Some(None)`: repository had no commits)
  previous_head: Option<Option<String>>,
  commit: Option<String>,
}

impl GitCommitStep {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Step for GitCommitStep {
  fn name(&self) -> &str {
    NAME
  }

  fn execute(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<StepResult> {
    let files = ctx.config.git.files_to_commit.clone();
    if files.is_empty() {
      return Ok(StepResult::failure("No files configured in git.files_to_commit"));
    }
    let message = ctx.render(&ctx.config.git.commit_message);

    if ctx.dry_run {
      ctx.log.info(NAME, format!("Would commit {} with message '{}'", files.join(", "), message));
      return Ok(StepResult::success(format!("Would commit '{}'", message)));
    }

    let git = ctx.git();
    git.ensure_repository()?;
    let previous = git.head_commit()?;

    ctx.log.debug(NAME, format!("Staging {}", files.join(", ")));
    git.add(&files)?;
    let sha = match git.commit(&message) {
      Ok(sha) => sha,
      Err(error) => {
        // Not on the rollback stack yet, so the staged files are ours to clean up
        if let Err(unstage) = git.unstage(&files, previous.is_some()) {
          ctx.log.warn(NAME, format!("Could not unstage {}: {}", files.join(", "), unstage));
        }
        return Err(error);
      }
    };

    ctx.log.info(NAME, format!("Created commit {}", short(&sha)));
    self.previous_head = Some(previous);
    self.commit = Some(sha.clone());
    Ok(StepResult::success(format!("Committed '{}' ({})", message, short(&sha))))
  }

  fn rollback(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<()> {
    let Some(commit) = self.commit.take() else {
      return Ok(());
    };

    let git = ctx.git();
    match self.previous_head.take().flatten() {
      Some(previous) => git.reset_mixed(&previous)?,
      None => git.delete_head()?,
    }
    ctx.log.info(NAME, format!("Removed commit {}", short(&commit)));
    Ok(())
  }
}

fn short(sha: &str) -> &str {
  &sha[..sha.len().min(7)]
}
