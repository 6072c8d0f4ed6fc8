//! `git_tag`: create (and optionally push) the release tag

use crate::core::context::ReleaseContext;
use crate::core::error::CosmosysResult;
use crate::core::step::{Step, StepResult};

pub const NAME: &str = "git_tag";

#[derive(Default)]
pub struct GitTagStep {
  tag: Option<String>,
  pushed: bool,
}

impl GitTagStep {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Step for GitTagStep {
  fn name(&self) -> &str {
    NAME
  }

  fn execute(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<StepResult> {
    let git_config = ctx.config.git.clone();
    let tag = format!("{}{}", git_config.tag_prefix, ctx.release_version());
    let message = ctx.render(&git_config.tag_message);

    if ctx.dry_run {
      ctx.log.info(NAME, format!("Would create tag {} ('{}')", tag, message));
      if git_config.push_tags {
        ctx.log.info(NAME, format!("Would push {} to {}", tag, git_config.remote));
      }
      return Ok(StepResult::success(format!("Would create tag {}", tag)));
    }

    let git = ctx.git();
    if git.tag_exists(&tag)? {
      return Ok(StepResult::failure(format!("Tag {} already exists", tag)));
    }

    git.create_tag(&tag, &message)?;
    ctx.log.info(NAME, format!("Created tag {}", tag));

    if git_config.push_tags {
      if let Err(e) = git.push_tag(&git_config.remote, &tag) {
        // Not on the rollback stack after a failure, so clean up here
        if let Err(cleanup) = git.delete_tag(&tag) {
          ctx.log.warn(NAME, format!("Could not delete local tag {}: {}", tag, cleanup));
        }
        return Ok(StepResult::failure(e.to_string()));
      }
      self.pushed = true;
      ctx.log.info(NAME, format!("Pushed {} to {}", tag, git_config.remote));
    }

    self.tag = Some(tag.clone());
    Ok(StepResult::success(format!("Created tag {}", tag)))
  }

  fn rollback(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<()> {
    let Some(tag) = self.tag.take() else {
      return Ok(());
    };
    let git = ctx.git();

    let remote_result = if self.pushed {
      let remote = ctx.config.git.remote.clone();
      let result = git.delete_remote_tag(&remote, &tag);
      if result.is_ok() {
        ctx.log.info(NAME, format!("Removed {} from {}", tag, remote));
      }
      result
    } else {
      Ok(())
    };

    if git.tag_exists(&tag)? {
      git.delete_tag(&tag)?;
      ctx.log.info(NAME, format!("Deleted tag {}", tag));
    }
    remote_result
  }
}
