//! Integration tests for `cosmosys config`

use crate::helpers::{STANDARD_CONFIG, TestProject, cosmosys, run_cosmosys, stderr, stdout};
use anyhow::Result;

#[test]
fn test_init_detects_rust_project() -> Result<()> {
  let project = TestProject::bare()?;

  let output = run_cosmosys(&project.path, &["config", "--init"])?;
  assert!(stdout(&output).contains("Initialized"));
  assert!(project.file_exists("cosmosys.toml"));

  let written = project.read_file("cosmosys.toml")?;
  assert!(written.contains("name = \"demo\""), "{}", written);
  assert!(written.contains("project_type = \"rust\""), "{}", written);
  assert!(written.contains("version_update"), "{}", written);

  // The generated file is a working configuration
  let output = run_cosmosys(&project.path, &["release", "--dry-run"])?;
  assert!(stdout(&output).contains("Target version: 1.0.1"));
  Ok(())
}

#[test]
fn test_init_refuses_to_overwrite() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;

  let output = cosmosys(&project.path, &["config", "--init"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("--force"));
  assert_eq!(project.read_file("cosmosys.toml")?, STANDARD_CONFIG);

  run_cosmosys(&project.path, &["config", "--init", "--force"])?;
  assert_ne!(project.read_file("cosmosys.toml")?, STANDARD_CONFIG);
  Ok(())
}

#[test]
fn test_set_then_get() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;

  let output = run_cosmosys(
    &project.path,
    &["config", "--set", "git.tag_prefix", "--value", "release-"],
  )?;
  assert!(stdout(&output).contains("Set git.tag_prefix = release-"));

  let output = run_cosmosys(&project.path, &["config", "--get", "git.tag_prefix"])?;
  assert_eq!(stdout(&output).trim(), "git.tag_prefix: release-");

  // Untouched parts of the file keep their layout
  assert!(project.read_file("cosmosys.toml")?.starts_with(STANDARD_CONFIG));
  Ok(())
}

#[test]
fn test_set_rejects_invalid_result() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;

  let output = cosmosys(
    &project.path,
    &["config", "--set", "release.steps", "--value", "git_tag"],
    &[],
  )?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("would make the configuration invalid"));
  assert_eq!(project.read_file("cosmosys.toml")?, STANDARD_CONFIG);
  Ok(())
}

#[test]
fn test_get_unknown_key() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;

  let output = cosmosys(&project.path, &["config", "--get", "git.nope"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Configuration key 'git.nope' not found"));
  Ok(())
}

#[test]
fn test_show_flattened_config() -> Result<()> {
  let project = TestProject::new(STANDARD_CONFIG)?;

  let output = run_cosmosys(&project.path, &["config"])?;
  let out = stdout(&output);
  assert!(out.contains("project.name"), "{}", out);
  assert!(out.contains("git.commit_message"), "{}", out);
  assert!(out.contains("chore: release {name} {version}"), "{}", out);
  Ok(())
}

#[test]
fn test_explicit_config_path() -> Result<()> {
  let project = TestProject::bare()?;
  project.write_file("release/cosmosys.toml", STANDARD_CONFIG)?;

  let output = run_cosmosys(
    &project.path,
    &["--config", "release/cosmosys.toml", "config", "--get", "project.name"],
  )?;
  assert_eq!(stdout(&output).trim(), "project.name: demo");

  let output = cosmosys(&project.path, &["--config", "nope.toml", "config"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Configuration file not found"));
  Ok(())
}
