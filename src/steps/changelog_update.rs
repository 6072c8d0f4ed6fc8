//! `changelog_update`: add an entry for the release to the changelog file

use crate::core::context::ReleaseContext;
use crate::core::error::{CosmosysResult, ResultExt};
use crate::core::step::{Step, StepResult};
use crate::release::changelog::{ChangelogEntry, insert_entry};
use crate::release::files::FileSnapshot;
use std::fs;

pub const NAME: &str = "changelog_update";

#[derive(Default)]
pub struct ChangelogUpdateStep {
  snapshot: Option<FileSnapshot>,
}

impl ChangelogUpdateStep {
  pub fn new() -> Self {
    Self::default()
  }

  fn build_entry(ctx: &mut ReleaseContext, version: &str, date: &str) -> CosmosysResult<ChangelogEntry> {
    if !ctx.config.changelog.from_commits {
      return Ok(ChangelogEntry::new(version, date));
    }

    let git = ctx.git();
    let since = git.last_tag()?;
    let commits = git.commits_since(since.as_deref())?;
    ctx.log.debug(
      NAME,
      format!(
        "Collected {} commit(s) since {}",
        commits.len(),
        since.as_deref().unwrap_or("the first commit")
      ),
    );
    Ok(ChangelogEntry::from_commits(
      version,
      date,
      commits.iter().map(|c| c.message.as_str()),
    ))
  }
}

impl Step for ChangelogUpdateStep {
  fn name(&self) -> &str {
    NAME
  }

  fn execute(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<StepResult> {
    let file = ctx.config.changelog.file.clone();
    let path = ctx.path(&file);
    let version = ctx.release_version();

    if !path.exists() {
      return Ok(StepResult::failure(format!("Failed to update changelog: {} not found", file)));
    }

    if ctx.dry_run {
      let source = if ctx.config.changelog.from_commits {
        "commits since the last tag"
      } else {
        "the empty template"
      };
      ctx.log.info(NAME, format!("Would add a {} entry to {} from {}", version, file, source));
      return Ok(StepResult::success(format!("Would update {} for version {}", file, version)));
    }

    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let entry = Self::build_entry(ctx, &version, &date)?;

    let existing = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", file))?;
    self.snapshot = Some(FileSnapshot::capture(&path)?);
    fs::write(&path, insert_entry(&existing, &entry.to_markdown()))
      .with_context(|| format!("Failed to write {}", file))?;

    ctx.log.info(NAME, format!("Added {} entry to {}", version, file));
    Ok(StepResult::success(format!("Updated changelog for version {}", version)))
  }

  fn rollback(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<()> {
    if let Some(snapshot) = self.snapshot.take() {
      snapshot.restore()?;
      ctx.log.info(NAME, format!("Restored {}", snapshot.path().display()));
    }
    Ok(())
  }
}
