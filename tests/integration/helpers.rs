//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const CHANGELOG: &str = "# Changelog\n\nAll notable changes to this project.\n\n## [1.0.0] - 2025-01-01\n\n- Initial release\n";

/// Config used by most tests: the four core steps on a Rust project
pub const STANDARD_CONFIG: &str = r#"[project]
name = "demo"
version = "1.0.0"
project_type = "rust"

[release]
steps = ["version_update", "changelog_update", "git_commit", "git_tag"]

[git]
files_to_commit = ["Cargo.toml", "CHANGELOG.md", "cosmosys.toml"]
commit_message = "chore: release {name} {version}"
"#;

/// A Rust project in a git repository with one commit
pub struct TestProject {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestProject {
  /// Project with `Cargo.toml`, `CHANGELOG.md` and the given `cosmosys.toml`
  pub fn new(config: &str) -> Result<Self> {
    let project = Self::bare()?;
    project.write_file("cosmosys.toml", config)?;
    project.commit("Add cosmosys configuration")?;
    Ok(project)
  }

  /// Project without a cosmosys configuration
  pub fn bare() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;
    git(&path, &["config", "tag.gpgsign", "false"])?;

    std::fs::write(
      path.join("Cargo.toml"),
      "[package]\nname = \"demo\"\nversion = \"1.0.0\" # keep in sync\nedition = \"2021\"\n",
    )?;
    std::fs::write(path.join("CHANGELOG.md"), CHANGELOG)?;

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial project"])?;

    Ok(Self { _root: root, path })
  }

  pub fn write_file(&self, relative: &str, content: &str) -> Result<()> {
    let path = self.path.join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
  }

  /// Write an executable script
  pub fn write_script(&self, relative: &str, content: &str) -> Result<()> {
    self.write_file(relative, content)?;
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      std::fs::set_permissions(self.path.join(relative), std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
  }

  pub fn read_file(&self, relative: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(relative))?)
  }

  pub fn file_exists(&self, relative: &str) -> bool {
    self.path.join(relative).exists()
  }

  /// Commit everything and return the new HEAD
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;
    self.head()
  }

  pub fn head(&self) -> Result<String> {
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Subject of the HEAD commit
  pub fn head_subject(&self) -> Result<String> {
    let output = git(&self.path, &["log", "-1", "--format=%s"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  pub fn tags(&self) -> Result<Vec<String>> {
    let output = git(&self.path, &["tag", "--list"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect(),
    )
  }

  /// `git status --porcelain` is empty
  pub fn is_clean(&self) -> Result<bool> {
    let output = git(&self.path, &["status", "--porcelain"])?;
    Ok(output.stdout.is_empty())
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run cosmosys and return its output whatever the exit status
pub fn cosmosys(cwd: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
  let mut command = Command::new(env!("CARGO_BIN_EXE_cosmosys"));
  command.current_dir(cwd).args(args).env_remove("RUST_LOG");
  for (key, value) in envs {
    command.env(key, value);
  }
  command.output().context("Failed to run cosmosys")
}

/// Run cosmosys and fail the test on a non-zero exit
pub fn run_cosmosys(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = cosmosys(cwd, args, &[])?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "cosmosys command failed: cosmosys {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}
