//! Changelog entries
//!
//! Two entry styles are produced:
//!
//! - a blank template (`### Added` / `### Changed` / `### Fixed`) to fill in by hand
//! - sections grouped from conventional commits (`feat(scope)!: description`)

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(?P<kind>[A-Za-z]+)(?:\((?P<scope>[^()]+)\))?(?P<bang>!)?:\s*(?P<desc>\S.*)$")
    .unwrap_or_else(|e| panic!("invalid conventional commit pattern: {e}"))
});

/// Conventional commit types, in changelog section order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommitKind {
  Feat,
  Fix,
  Perf,
  Refactor,
  Docs,
  Build,
  Ci,
  Test,
  Chore,
  Revert,
  Other,
}

impl CommitKind {
  pub fn parse(s: &str) -> Self {
    match s.to_ascii_lowercase().as_str() {
      "feat" | "feature" => Self::Feat,
      "fix" => Self::Fix,
      "perf" => Self::Perf,
      "refactor" => Self::Refactor,
      "docs" | "doc" => Self::Docs,
      "build" => Self::Build,
      "ci" => Self::Ci,
      "test" | "tests" => Self::Test,
      "chore" | "style" => Self::Chore,
      "revert" => Self::Revert,
      _ => Self::Other,
    }
  }

  /// Section title in the rendered changelog
  pub fn section(self) -> &'static str {
    match self {
      Self::Feat => "Added",
      Self::Fix => "Fixed",
      Self::Perf => "Performance",
      Self::Refactor => "Changed",
      Self::Docs => "Documentation",
      Self::Build => "Build",
      Self::Ci => "CI",
      Self::Test => "Tests",
      Self::Chore => "Maintenance",
      Self::Revert => "Reverted",
      Self::Other => "Other",
    }
  }
}

impl fmt::Display for CommitKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.section())
  }
}

/// Subject line of a conventional commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalCommit {
  pub kind: CommitKind,
  pub scope: Option<String>,
  pub description: String,
  pub breaking: bool,
}

impl ConventionalCommit {
  /// Parse a full commit message; `None` if the subject is not conventional
  pub fn parse(message: &str) -> Option<Self> {
    let subject = message.lines().next()?.trim();
    let caps = HEADER.captures(subject)?;

    let footer_breaking = message
      .lines()
      .skip(1)
      .any(|l| l.starts_with("BREAKING CHANGE:") || l.starts_with("BREAKING-CHANGE:"));

    Some(Self {
      kind: CommitKind::parse(&caps["kind"]),
      scope: caps.name("scope").map(|m| m.as_str().trim().to_string()),
      description: caps["desc"].trim().to_string(),
      breaking: caps.name("bang").is_some() || footer_breaking,
    })
  }

  fn render(&self) -> String {
    let scope = self.scope.as_ref().map(|s| format!("**{}**: ", s)).unwrap_or_default();
    let breaking = if self.breaking { " (**BREAKING**)" } else { "" };
    format!("- {}{}{}", scope, self.description, breaking)
  }
}

/// One release section of the changelog
#[derive(Debug, Clone)]
pub struct ChangelogEntry {
  pub version: String,
  pub date: String,
  sections: BTreeMap<CommitKind, Vec<ConventionalCommit>>,
  /// Non-conventional commit subjects
  other: Vec<String>,
}

impl ChangelogEntry {
  pub fn new(version: impl Into<String>, date: impl Into<String>) -> Self {
    Self {
      version: version.into(),
      date: date.into(),
      sections: BTreeMap::new(),
      other: Vec::new(),
    }
  }

  /// Group commit messages by conventional type
  pub fn from_commits<'a>(version: &str, date: &str, messages: impl IntoIterator<Item = &'a str>) -> Self {
    let mut entry = Self::new(version, date);
    for message in messages {
      entry.add_commit(message);
    }
    entry
  }

  pub fn add_commit(&mut self, message: &str) {
    match ConventionalCommit::parse(message) {
      Some(commit) => self.sections.entry(commit.kind).or_default().push(commit),
      None => {
        if let Some(subject) = message.lines().next().map(str::trim).filter(|s| !s.is_empty()) {
          self.other.push(subject.to_string());
        }
      }
    }
  }

  pub fn is_empty(&self) -> bool {
    self.sections.is_empty() && self.other.is_empty()
  }

  /// Render as Markdown; an empty entry renders the fill-in template
  pub fn to_markdown(&self) -> String {
    let mut out = format!("## [{}] - {}\n\n", self.version, self.date);

    if self.is_empty() {
      for section in ["Added", "Changed", "Fixed"] {
        out.push_str(&format!("### {}\n- \n\n", section));
      }
      return out;
    }

    for (kind, commits) in &self.sections {
      out.push_str(&format!("### {}\n", kind.section()));
      for commit in commits {
        out.push_str(&commit.render());
        out.push('\n');
      }
      out.push('\n');
    }

    if !self.other.is_empty() {
      out.push_str("### Other\n");
      for subject in &self.other {
        out.push_str(&format!("- {}\n", subject));
      }
      out.push('\n');
    }

    out
  }
}

/// Insert `entry` as the newest release in `existing`
///
/// A leading `# Title` block stays on top; otherwise the entry is prepended.
pub fn insert_entry(existing: &str, entry: &str) -> String {
  let mut lines = existing.split_inclusive('\n').peekable();
  let mut head = String::new();

  if existing.starts_with("# ") {
    // Title plus any intro text up to the first release section
    while let Some(line) = lines.peek() {
      if line.starts_with("## ") {
        break;
      }
      head.push_str(line);
      lines.next();
    }
  }

  let rest: String = lines.collect();
  let mut out = head;
  if !out.is_empty() && !out.ends_with("\n\n") {
    out.push_str(if out.ends_with('\n') { "\n" } else { "\n\n" });
  }
  out.push_str(entry);
  out.push_str(&rest);
  out
}
