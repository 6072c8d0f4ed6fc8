//! Git operations used by the release steps
//!
//! Thin wrapper over the `git` CLI. All invocations go through the context's
//! [`ProcessRunner`] so that tests can observe them without a repository.

use crate::core::error::{CosmosysError, CosmosysResult, GitError};
use crate::core::process::{ProcessCommand, ProcessOutput, ProcessRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A commit as seen by the changelog generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
  pub sha: String,
  pub message: String,
}

/// Git backend bound to a working tree
pub struct Git {
  runner: Arc<dyn ProcessRunner>,
  work_tree: PathBuf,
}

impl Git {
  pub fn new(runner: Arc<dyn ProcessRunner>, work_tree: &Path) -> Self {
    Self {
      runner,
      work_tree: work_tree.to_path_buf(),
    }
  }

  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Fail with `RepoNotFound` unless the working tree is inside a repository
  pub fn ensure_repository(&self) -> CosmosysResult<()> {
    let output = self.raw(&["rev-parse", "--is-inside-work-tree"])?;
    if output.success && output.stdout.trim() == "true" {
      return Ok(());
    }
    Err(
      GitError::RepoNotFound {
        path: self.work_tree.clone(),
      }
      .into(),
    )
  }

  /// HEAD commit SHA, or `None` for a repository without commits
  pub fn head_commit(&self) -> CosmosysResult<Option<String>> {
    let output = self.raw(&["rev-parse", "--verify", "-q", "HEAD"])?;
    if !output.success {
      return Ok(None);
    }
    Ok(Some(output.stdout.trim().to_string()))
  }

  /// Stage paths
  pub fn add(&self, paths: &[String]) -> CosmosysResult<()> {
    let mut args = vec!["add", "--"];
    args.extend(paths.iter().map(String::as_str));
    self.checked(&args)?;
    Ok(())
  }

  /// Drop staged changes to `paths`, leaving the working tree alone
  ///
  /// Without a HEAD there is nothing to reset to, so the paths leave the index.
  pub fn unstage(&self, paths: &[String], has_head: bool) -> CosmosysResult<()> {
    let mut args = if has_head {
      vec!["reset", "-q", "--"]
    } else {
      vec!["rm", "-q", "-r", "--cached", "--ignore-unmatch", "--"]
    };
    args.extend(paths.iter().map(String::as_str));
    self.checked(&args)?;
    Ok(())
  }

  /// Create a commit and return its SHA
  pub fn commit(&self, message: &str) -> CosmosysResult<String> {
    self.checked(&["commit", "-m", message])?;
    self
      .head_commit()?
      .ok_or_else(|| CosmosysError::message("HEAD is missing right after committing"))
  }

  /// `git reset --mixed <sha>`: drop commits after `sha`, keep the working tree
  pub fn reset_mixed(&self, sha: &str) -> CosmosysResult<()> {
    self.checked(&["reset", "--mixed", sha])?;
    Ok(())
  }

  /// Remove the only commit of a fresh repository (index is kept)
  pub fn delete_head(&self) -> CosmosysResult<()> {
    self.checked(&["update-ref", "-d", "HEAD"])?;
    Ok(())
  }

  pub fn tag_exists(&self, tag: &str) -> CosmosysResult<bool> {
    let reference = format!("refs/tags/{}", tag);
    Ok(self.raw(&["rev-parse", "--verify", "-q", &reference])?.success)
  }

  /// Create an annotated tag at HEAD
  pub fn create_tag(&self, tag: &str, message: &str) -> CosmosysResult<()> {
    self.checked(&["tag", "-a", tag, "-m", message])?;
    Ok(())
  }

  pub fn delete_tag(&self, tag: &str) -> CosmosysResult<()> {
    self.checked(&["tag", "-d", tag])?;
    Ok(())
  }

  pub fn push_tag(&self, remote: &str, tag: &str) -> CosmosysResult<()> {
    let reference = format!("refs/tags/{}", tag);
    self.push(remote, &reference, &reference)
  }

  pub fn delete_remote_tag(&self, remote: &str, tag: &str) -> CosmosysResult<()> {
    let reference = format!("refs/tags/{}", tag);
    self.push(remote, &format!(":{}", reference), &reference)
  }

  /// Most recent tag reachable from HEAD
  pub fn last_tag(&self) -> CosmosysResult<Option<String>> {
    let output = self.raw(&["describe", "--tags", "--abbrev=0"])?;
    if !output.success {
      return Ok(None);
    }
    let tag = output.stdout.trim();
    Ok((!tag.is_empty()).then(|| tag.to_string()))
  }

  /// Commits in `since..HEAD` (or all of HEAD), newest first
  pub fn commits_since(&self, since: Option<&str>) -> CosmosysResult<Vec<CommitInfo>> {
    if self.head_commit()?.is_none() {
      return Ok(Vec::new());
    }

    let range = match since {
      Some(tag) => format!("{}..HEAD", tag),
      None => "HEAD".to_string(),
    };
    let stdout = self.checked(&["log", "--format=%H%x1f%B%x1e", &range])?;

    Ok(
      stdout
        .split('\x1e')
        .filter_map(|record| {
          let (sha, message) = record.trim().split_once('\x1f')?;
          Some(CommitInfo {
            sha: sha.to_string(),
            message: message.trim().to_string(),
          })
        })
        .collect(),
    )
  }

  fn push(&self, remote: &str, refspec: &str, reference: &str) -> CosmosysResult<()> {
    let output = self.raw(&["push", remote, refspec])?;
    if !output.success {
      return Err(
        GitError::PushFailed {
          remote: remote.to_string(),
          reference: reference.to_string(),
          reason: output.summary(),
        }
        .into(),
      );
    }
    Ok(())
  }

  /// Run git and fail on a non-zero exit; returns stdout
  fn checked(&self, args: &[&str]) -> CosmosysResult<String> {
    let output = self.raw(args)?;
    if !output.success {
      return Err(
        GitError::CommandFailed {
          command: format!("git {}", args.join(" ")),
          stderr: output.stderr.trim().to_string(),
        }
        .into(),
      );
    }
    Ok(output.stdout)
  }

  fn raw(&self, args: &[&str]) -> CosmosysResult<ProcessOutput> {
    // Never block on credential prompts during push
    let command = ProcessCommand::new("git")
      .args(args.iter().copied())
      .env("GIT_TERMINAL_PROMPT", "0");
    self.runner.run(&self.work_tree, &command)
  }
}
