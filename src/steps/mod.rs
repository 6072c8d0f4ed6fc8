//! Built-in release steps
//!
//! | step | does | rollback |
//! |---|---|---|
//! | version_update | bump and write the version | restore files |
//! | changelog_update | add a changelog entry | restore file |
//! | git_commit | commit `git.files_to_commit` | reset to the previous HEAD |
//! | git_tag | annotated `{tag_prefix}{version}` tag, optional push | delete tag |
//! | build_* | run the ecosystem build | build_node removes `dist`/`build` |
//! | publish_* | upload the package | irreversible (warning) |

pub mod changelog_update;
pub mod command;
pub mod git_commit;
pub mod git_tag;
pub mod version_update;

pub use changelog_update::ChangelogUpdateStep;
pub use command::{CommandStep, RollbackAction};
pub use git_commit::GitCommitStep;
pub use git_tag::GitTagStep;
pub use version_update::VersionUpdateStep;

use crate::core::context::ReleaseContext;
use crate::core::error::PipelineError;
use crate::core::process::ProcessCommand;
use crate::core::registry::{StepOrigin, StepRegistry};
use crate::core::step::Step;
use std::fs;

/// Register every built-in step
pub fn register_builtin_steps(registry: &mut StepRegistry) -> Result<(), PipelineError> {
  registry.register_described(
    version_update::NAME,
    "Bump the version and write it into the project files",
    StepOrigin::Builtin,
    |_| Ok(Box::new(VersionUpdateStep::new()) as Box<dyn Step>),
  )?;
  registry.register_described(
    changelog_update::NAME,
    "Add an entry for the release to the changelog",
    StepOrigin::Builtin,
    |_| Ok(Box::new(ChangelogUpdateStep::new()) as Box<dyn Step>),
  )?;
  registry.register_described(
    git_commit::NAME,
    "Commit the release changes",
    StepOrigin::Builtin,
    |_| Ok(Box::new(GitCommitStep::new()) as Box<dyn Step>),
  )?;
  registry.register_described(
    git_tag::NAME,
    "Create and optionally push the release tag",
    StepOrigin::Builtin,
    |_| Ok(Box::new(GitTagStep::new()) as Box<dyn Step>),
  )?;

  registry.register_described("build_rust", "cargo build --release", StepOrigin::Builtin, |_| {
    let command = ProcessCommand::new("cargo").args(["build", "--release"]);
    Ok(Box::new(CommandStep::new("build_rust", command)) as Box<dyn Step>)
  })?;
  registry.register_described("build_python", "python -m build", StepOrigin::Builtin, |_| {
    let command = ProcessCommand::new("python").args(["-m", "build"]);
    Ok(Box::new(CommandStep::new("build_python", command)) as Box<dyn Step>)
  })?;
  registry.register_described("build_node", "npm run build", StepOrigin::Builtin, |_| {
    let command = ProcessCommand::new("npm").args(["run", "build"]);
    let step = CommandStep::new("build_node", command)
      .with_rollback(RollbackAction::RemovePaths(vec!["dist".to_string(), "build".to_string()]));
    Ok(Box::new(step) as Box<dyn Step>)
  })?;

  registry.register_described("publish_crates_io", "cargo publish", StepOrigin::Builtin, |_| {
    let command = ProcessCommand::new("cargo").arg("publish");
    Ok(Box::new(irreversible_publish("publish_crates_io", command, "crates.io")) as Box<dyn Step>)
  })?;
  registry.register_described("publish_pypi", "twine upload dist/*", StepOrigin::Builtin, |ctx| {
    let command = ProcessCommand::new("twine").arg("upload").args(dist_files(ctx));
    Ok(Box::new(irreversible_publish("publish_pypi", command, "PyPI")) as Box<dyn Step>)
  })?;
  registry.register_described("publish_npm", "npm publish", StepOrigin::Builtin, |_| {
    let command = ProcessCommand::new("npm").arg("publish");
    Ok(Box::new(irreversible_publish("publish_npm", command, "npm")) as Box<dyn Step>)
  })?;

  Ok(())
}

fn irreversible_publish(name: &str, command: ProcessCommand, registry: &str) -> CommandStep {
  CommandStep::new(name, command).with_rollback(RollbackAction::Irreversible(format!(
    "Cannot automatically unpublish from {}; remove the release manually if necessary",
    registry
  )))
}

/// `dist/*` expanded without a shell; the pattern itself when nothing matches
fn dist_files(ctx: &ReleaseContext) -> Vec<String> {
  let mut files: Vec<String> = fs::read_dir(ctx.path("dist"))
    .into_iter()
    .flatten()
    .filter_map(Result::ok)
    .filter(|e| e.path().is_file())
    .map(|e| format!("dist/{}", e.file_name().to_string_lossy()))
    .collect();
  files.sort();

  if files.is_empty() {
    files.push("dist/*".to_string());
  }
  files
}
