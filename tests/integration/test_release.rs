//! Integration tests for `cosmosys release`

use crate::helpers::{CHANGELOG, STANDARD_CONFIG, TestProject, cosmosys, run_cosmosys, stderr, stdout};
use anyhow::Result;

#[test]
fn test_full_release() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;

  let output = run_cosmosys(&project.path, &["release", "--part", "minor"])?;
  let out = stdout(&output);
  assert!(out.contains("Target version: 1.1.0"), "stdout: {}", out);
  assert!(out.contains("completed"), "stdout: {}", out);

  let cargo_toml = project.read_file("Cargo.toml")?;
  assert!(
    cargo_toml.contains("version = \"1.1.0\" # keep in sync"),
    "Cargo.toml formatting should be preserved:\n{}",
    cargo_toml
  );
  assert!(project.read_file("cosmosys.toml")?.contains("version = \"1.1.0\""));

  let changelog = project.read_file("CHANGELOG.md")?;
  assert!(changelog.starts_with("# Changelog\n\nAll notable changes to this project.\n\n## [1.1.0] - "));
  assert!(changelog.contains("## [1.0.0] - 2025-01-01"));

  assert_eq!(project.head_subject()?, "chore: release demo 1.1.0");
  assert_eq!(project.tags()?, vec!["v1.1.0"]);
  assert!(project.is_clean()?, "release commit should include every rewritten file");

  Ok(())
}

#[test]
fn test_explicit_new_version() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;

  run_cosmosys(&project.path, &["release", "--new-version", "v3.0.0-rc.1"])?;

  assert!(project.read_file("Cargo.toml")?.contains("version = \"3.0.0-rc.1\""));
  assert_eq!(project.tags()?, vec!["v3.0.0-rc.1"]);
  Ok(())
}

#[test]
fn test_invalid_new_version_is_rejected_up_front() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;
  let head = project.head()?;

  let output = cosmosys(&project.path, &["release", "--new-version", "next"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Invalid --new-version"));
  assert_eq!(project.head()?, head);
  Ok(())
}

#[test]
fn test_dry_run_changes_nothing() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;
  let head = project.head()?;

  let output = run_cosmosys(&project.path, &["release", "--dry-run"])?;
  let out = stdout(&output);
  assert!(out.contains("Dry-run mode"), "stdout: {}", out);
  assert!(out.contains("Dry run of release 1.0.1 completed"), "stdout: {}", out);

  assert!(project.read_file("Cargo.toml")?.contains("version = \"1.0.0\""));
  assert_eq!(project.read_file("CHANGELOG.md")?, CHANGELOG);
  assert_eq!(project.head()?, head);
  assert!(project.tags()?.is_empty());
  assert!(project.is_clean()?);
  Ok(())
}

#[test]
fn test_failed_step_rolls_back_in_reverse_order() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;
  crate::helpers::git(&project.path, &["tag", "v1.0.1"])?;
  let head = project.head()?;

  let output = cosmosys(&project.path, &["release"], &[])?;
  assert_eq!(output.status.code(), Some(4), "stderr: {}", stderr(&output));

  let out = stdout(&output);
  assert!(out.contains("Release failed at step 'git_tag': Tag v1.0.1 already exists"), "stdout: {}", out);
  assert!(
    out.contains("Rolled back: git_commit → changelog_update → version_update"),
    "stdout: {}",
    out
  );

  assert_eq!(project.head()?, head, "release commit should be removed");
  assert!(project.read_file("Cargo.toml")?.contains("version = \"1.0.0\""));
  assert_eq!(project.read_file("CHANGELOG.md")?, CHANGELOG);
  assert!(project.is_clean()?);
  Ok(())
}

#[test]
fn test_missing_changelog_fails_and_restores_version() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;
  std::fs::remove_file(project.path.join("CHANGELOG.md"))?;
  project.commit("Drop changelog")?;

  let output = cosmosys(&project.path, &["release"], &[])?;
  assert_eq!(output.status.code(), Some(4));
  assert!(stdout(&output).contains("CHANGELOG.md not found"));
  assert!(project.read_file("Cargo.toml")?.contains("version = \"1.0.0\""));
  assert!(project.tags()?.is_empty());
  Ok(())
}

const CONDITIONAL_CONFIG: &str = r#"[project]
name = "demo"
version = "1.0.0"
project_type = "rust"

[release]
steps = [
  "version_update",
  { step = "git_tag", condition = "${TAG_RELEASE:-false}" },
]
"#;

#[test]
fn test_condition_skips_step() -> Result<()> {
  let project = TestProject::new(CONDITIONAL_CONFIG)?;

  let output = run_cosmosys(&project.path, &["release"])?;
  assert!(stdout(&output).contains("git_tag (skipped)"));
  assert!(project.tags()?.is_empty());
  assert!(project.read_file("Cargo.toml")?.contains("version = \"1.0.1\""));
  Ok(())
}

#[test]
fn test_condition_reads_process_environment() -> Result<()> {
  let project = TestProject::new(CONDITIONAL_CONFIG)?;

  let output = cosmosys(&project.path, &["release"], &[("TAG_RELEASE", "true")])?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));
  assert_eq!(project.tags()?, vec!["v1.0.1"]);
  Ok(())
}

#[test]
fn test_environment_overrides_configured_variables() -> Result<()> {
  let config = format!("{}\n[release.variables]\nTAG_RELEASE = \"no\"\n", CONDITIONAL_CONFIG);
  let project = TestProject::new(&config)?;

  run_cosmosys(&project.path, &["release"])?;
  assert!(project.tags()?.is_empty(), "configured default should skip the tag");

  let project = TestProject::new(&config)?;
  let output = cosmosys(&project.path, &["release"], &[("TAG_RELEASE", "1")])?;
  assert!(output.status.success());
  assert_eq!(project.tags()?, vec!["v1.0.1"]);
  Ok(())
}

#[test]
fn test_unknown_step_fails_before_any_step_runs() -> Result<()> {
  let config = STANDARD_CONFIG.replace("\"git_tag\"]", "\"git_tag\", \"deploy_moon\"]");
  let project = TestProject::new(&config)?;

  let output = cosmosys(&project.path, &["release"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("Unknown release step: deploy_moon"), "stderr: {}", err);
  assert!(err.contains("Registered steps:"), "stderr: {}", err);
  assert!(project.read_file("Cargo.toml")?.contains("version = \"1.0.0\""));
  Ok(())
}

#[test]
fn test_bad_condition_fails_even_when_step_would_be_skipped() -> Result<()> {
  let config = CONDITIONAL_CONFIG.replace("${TAG_RELEASE:-false}", "${TAG_RELEASE");
  let project = TestProject::new(&config)?;

  let output = cosmosys(&project.path, &["release"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Invalid condition for step 'git_tag'"));
  assert!(project.read_file("Cargo.toml")?.contains("version = \"1.0.0\""));
  Ok(())
}

#[test]
fn test_json_outcome() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;

  let output = run_cosmosys(&project.path, &["release", "--dry-run", "--json"])?;
  let json: serde_json::Value = serde_json::from_str(&stdout(&output))?;

  assert_eq!(json["succeeded"], true);
  assert_eq!(json["dry_run"], true);
  assert_eq!(
    json["executed_steps"],
    serde_json::json!(["version_update", "changelog_update", "git_commit", "git_tag"])
  );
  assert_eq!(json["steps"][0]["state"], "succeeded");
  Ok(())
}

#[test]
fn test_json_outcome_on_failure() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;
  crate::helpers::git(&project.path, &["tag", "v1.0.1"])?;

  let output = cosmosys(&project.path, &["release", "--json"], &[])?;
  assert_eq!(output.status.code(), Some(4));

  let json: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert_eq!(json["succeeded"], false);
  assert_eq!(json["failed_step"], "git_tag");
  assert_eq!(
    json["rolled_back_steps"],
    serde_json::json!(["git_commit", "changelog_update", "version_update"])
  );
  Ok(())
}

#[test]
fn test_missing_config() -> Result<()> {
  let project = TestProject::bare()?;

  let output = cosmosys(&project.path, &["release"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("No cosmosys configuration found"), "stderr: {}", err);
  assert!(err.contains("config --init"));
  Ok(())
}

#[cfg(unix)]
#[test]
fn test_rejected_commit_leaves_index_clean() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;
  project.write_script(".git/hooks/pre-commit", "#!/bin/sh\necho 'hook says no' >&2\nexit 1\n")?;
  let head = project.head()?;

  let output = cosmosys(&project.path, &["release"], &[])?;
  assert_eq!(output.status.code(), Some(4));
  let out = stdout(&output);
  assert!(out.contains("Release failed at step 'git_commit'"), "stdout: {}", out);
  assert!(out.contains("Rolled back: changelog_update → version_update"), "stdout: {}", out);

  assert_eq!(project.head()?, head);
  assert!(project.tags()?.is_empty());
  assert!(project.is_clean()?, "staged release files should be reset");
  Ok(())
}
