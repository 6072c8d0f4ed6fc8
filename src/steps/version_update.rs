//! `version_update`: compute the release version and write it into project files

use crate::core::context::ReleaseContext;
use crate::core::error::CosmosysResult;
use crate::core::step::{Step, StepResult};
use crate::release::files::{self, FileSnapshot};
use std::path::PathBuf;

pub const NAME: &str = "version_update";

#[derive(Default)]
pub struct VersionUpdateStep {
  snapshots: Vec<FileSnapshot>,
  previous_target: Option<semver::Version>,
}

impl VersionUpdateStep {
  pub fn new() -> Self {
    Self::default()
  }

  /// Project type defaults, then `version_update.files`, then the config file
  fn version_files(ctx: &ReleaseContext) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    let candidates = ctx
      .config
      .project
      .project_type
      .default_version_files()
      .iter()
      .map(|f| ctx.path(f))
      .chain(ctx.config.version_update.files.iter().map(|f| ctx.path(f)))
      .chain(ctx.config_path.clone());

    for path in candidates {
      if !files.contains(&path) {
        files.push(path);
      }
    }
    files
  }

  fn display(ctx: &ReleaseContext, path: &std::path::Path) -> String {
    path.strip_prefix(&ctx.root).unwrap_or(path).display().to_string()
  }

  fn rewrite_all(&mut self, ctx: &mut ReleaseContext, files: &[PathBuf], old: &str, new: &str) -> CosmosysResult<()> {
    for path in files {
      let shown = Self::display(ctx, path);
      if !path.exists() {
        ctx.log.warn(NAME, format!("File not found: {}", shown));
        continue;
      }

      self.snapshots.push(FileSnapshot::capture(path)?);
      if files::update_file(path, old, new)? {
        ctx.log.info(NAME, format!("Updated {}", shown));
      } else {
        ctx.log.warn(NAME, format!("No version found in {}", shown));
      }
    }
    Ok(())
  }

  fn restore(&mut self) -> CosmosysResult<()> {
    let mut first_error = None;
    while let Some(snapshot) = self.snapshots.pop() {
      if let Err(e) = snapshot.restore() {
        first_error.get_or_insert(e);
      }
    }
    first_error.map_or(Ok(()), Err)
  }
}

impl Step for VersionUpdateStep {
  fn name(&self) -> &str {
    NAME
  }

  fn execute(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<StepResult> {
    let target = match ctx.version_request.resolve(&ctx.project.current_version) {
      Ok(v) => v,
      Err(reason) => return Ok(StepResult::failure(format!("Failed to update version: {}", reason))),
    };
    let current = ctx.project.current_version.clone();
    let new = target.to_string();
    let files = Self::version_files(ctx);

    self.previous_target = ctx.project.target_version.replace(target);

    if ctx.dry_run {
      for path in &files {
        let shown = Self::display(ctx, path);
        if path.exists() {
          ctx.log.info(NAME, format!("Would update version in {}", shown));
        } else {
          ctx.log.warn(NAME, format!("File not found: {}", shown));
        }
      }
      return Ok(StepResult::success(format!("Would update version from {} to {}", current, new)));
    }

    ctx.log.info(NAME, format!("Updating version from {} to {}", current, new));
    if let Err(e) = self.rewrite_all(ctx, &files, &current, &new) {
      // Leave no half-updated files behind; this step will not be rolled back
      ctx.project.target_version = self.previous_target.take();
      let mut message = format!("Failed to update version: {}", e);
      if let Err(restore) = self.restore() {
        ctx.log.warn(NAME, format!("Could not restore version files: {}", restore));
        message.push_str(&format!(" (restoring version files also failed: {})", restore));
      }
      return Ok(StepResult::failure(message));
    }

    Ok(StepResult::success(format!("Updated version to {}", new)))
  }

  fn rollback(&mut self, ctx: &mut ReleaseContext) -> CosmosysResult<()> {
    let restored = self.snapshots.len();
    ctx.project.target_version = self.previous_target.take();
    self.restore()?;
    if restored > 0 {
      ctx.log.info(
        NAME,
        format!("Restored {} file(s) to version {}", restored, ctx.project.current_version),
      );
    }
    Ok(())
  }
}
