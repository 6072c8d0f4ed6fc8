//! Integration tests for plugin steps and `cosmosys plugins` / `cosmosys steps`

use crate::helpers::{TestProject, cosmosys, run_cosmosys, stderr, stdout};
use anyhow::Result;

const RECORDER: &str = r#"#!/bin/sh
# Record every call in journal.txt
echo "$1 $COSMOSYS_STEP $COSMOSYS_VERSION dry=$COSMOSYS_DRY_RUN" >> "$COSMOSYS_ROOT/journal.txt"
"#;

fn config(steps: &str, extra: &str) -> String {
  format!(
    "[project]\nname = \"demo\"\nversion = \"1.0.0\"\nproject_type = \"rust\"\n\n[release]\nsteps = {}\n{}",
    steps, extra
  )
}

#[test]
fn test_command_plugin_runs_with_placeholders() -> Result<()> {
  let project = TestProject::new(&config(
    "[\"version_update\", \"announce\"]",
    "\n[plugins.steps.announce]\ncommand = [\"sh\", \"-c\", \"echo {name} {version} > announced.txt\"]\ndescription = \"Announce the release\"\n",
  ))?;

  run_cosmosys(&project.path, &["release"])?;
  assert_eq!(project.read_file("announced.txt")?.trim(), "demo 1.0.1");
  Ok(())
}

#[cfg(unix)]
#[test]
fn test_directory_plugin_executes_and_rolls_back() -> Result<()> {
  let project = TestProject::new(&config(
    "[\"version_update\", \"recorder\", \"explode\"]",
    "\n[plugins.steps.explode]\ncommand = [\"sh\", \"-c\", \"echo boom >&2; exit 3\"]\n",
  ))?;
  project.write_script("plugins/recorder.sh", RECORDER)?;

  let output = cosmosys(&project.path, &["release"], &[])?;
  assert_eq!(output.status.code(), Some(4), "stderr: {}", stderr(&output));
  assert!(stdout(&output).contains("Release failed at step 'explode'"));
  assert!(stdout(&output).contains("boom"));

  let journal = project.read_file("journal.txt")?;
  assert_eq!(
    journal.lines().collect::<Vec<_>>(),
    vec!["execute recorder 1.0.1 dry=0", "rollback recorder 1.0.1 dry=0"]
  );
  assert!(project.read_file("Cargo.toml")?.contains("version = \"1.0.0\""));
  Ok(())
}

#[cfg(unix)]
#[test]
fn test_directory_plugin_is_not_run_in_dry_run() -> Result<()> {
  let project = TestProject::new(&config("[\"recorder\"]", ""))?;
  project.write_script("plugins/recorder.sh", RECORDER)?;

  let output = run_cosmosys(&project.path, &["release", "--dry-run"])?;
  assert!(stdout(&output).contains("Would run"));
  assert!(!project.file_exists("journal.txt"));
  Ok(())
}

#[cfg(unix)]
#[test]
fn test_plugins_list_and_info() -> Result<()> {
  let project = TestProject::new(&config(
    "[]",
    "\n[plugins.steps.announce]\ncommand = [\"true\"]\ndescription = \"Announce the release\"\n",
  ))?;
  project.write_script("plugins/recorder.sh", RECORDER)?;
  project.write_script("plugins/_shared.sh", "#!/bin/sh\n")?;

  let output = run_cosmosys(&project.path, &["plugins", "--list"])?;
  let out = stdout(&output);
  assert!(out.contains("announce"), "{}", out);
  assert!(out.contains("recorder"), "{}", out);
  assert!(!out.contains("_shared"), "{}", out);

  let output = run_cosmosys(&project.path, &["plugins", "--info", "recorder"])?;
  let out = stdout(&output);
  assert!(out.contains("Record every call in journal.txt"), "{}", out);
  assert!(out.contains("directory"), "{}", out);

  let output = cosmosys(&project.path, &["plugins", "--info", "missing"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Plugin 'missing' not found"));
  Ok(())
}

#[test]
fn test_steps_lists_builtins_and_plugins() -> Result<()> {
  let project = TestProject::new(&config(
    "[\"version_update\"]",
    "\n[plugins.steps.announce]\ncommand = [\"true\"]\n",
  ))?;

  let output = run_cosmosys(&project.path, &["steps", "--json"])?;
  let steps: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  let names: Vec<&str> = steps
    .as_array()
    .map(|a| a.iter().filter_map(|s| s["name"].as_str()).collect())
    .unwrap_or_default();

  for builtin in [
    "build_node",
    "build_python",
    "build_rust",
    "changelog_update",
    "git_commit",
    "git_tag",
    "publish_crates_io",
    "publish_npm",
    "publish_pypi",
    "version_update",
  ] {
    assert!(names.contains(&builtin), "missing {}", builtin);
  }
  assert!(names.contains(&"announce"));
  Ok(())
}

#[test]
fn test_plugin_cannot_replace_builtin() -> Result<()> {
  let project = TestProject::new(&config(
    "[\"git_tag\"]",
    "\n[plugins.steps.git_tag]\ncommand = [\"true\"]\n",
  ))?;

  let output = cosmosys(&project.path, &["release"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Release step 'git_tag' is already registered"));
  assert!(project.tags()?.is_empty());
  Ok(())
}

#[test]
fn test_empty_plugin_command_is_plugin_error() -> Result<()> {
  let project = TestProject::new(&config("[]", "\n[plugins.steps.broken]\ncommand = []\n"))?;

  let output = cosmosys(&project.path, &["steps"], &[])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("Plugin step 'broken' has an empty command"));
  Ok(())
}
