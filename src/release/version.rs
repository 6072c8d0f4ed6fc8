//! Semver bumping and target version resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pre-release identifier used by the `pre*` bumps
pub const PRERELEASE_TOKEN: &str = "rc";

/// Which part of the version to bump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BumpPart {
  Major,
  Minor,
  Patch,
  Premajor,
  Preminor,
  Prepatch,
  Prerelease,
}

impl BumpPart {
  pub const ALL: [BumpPart; 7] = [
    BumpPart::Major,
    BumpPart::Minor,
    BumpPart::Patch,
    BumpPart::Premajor,
    BumpPart::Preminor,
    BumpPart::Prepatch,
    BumpPart::Prerelease,
  ];

  /// Apply the bump
  ///
  /// `major`/`minor`/`patch` drop any pre-release and build metadata.
  /// `prerelease` increments the trailing number of an existing `rc.N`
  /// pre-release, or bumps the patch and starts at `rc.1`. Fails when the
  /// bumped number does not fit in a `u64`.
  pub fn apply(self, version: &semver::Version) -> Result<semver::Version, String> {
    let (major, minor, patch) = (version.major, version.minor, version.patch);
    let bumped = match self {
      BumpPart::Major => semver::Version::new(increment(major, "major")?, 0, 0),
      BumpPart::Minor => semver::Version::new(major, increment(minor, "minor")?, 0),
      BumpPart::Patch => semver::Version::new(major, minor, increment(patch, "patch")?),
      BumpPart::Premajor => with_rc(semver::Version::new(increment(major, "major")?, 0, 0), 1),
      BumpPart::Preminor => with_rc(semver::Version::new(major, increment(minor, "minor")?, 0), 1),
      BumpPart::Prepatch => with_rc(semver::Version::new(major, minor, increment(patch, "patch")?), 1),
      BumpPart::Prerelease => match next_rc_number(&version.pre)? {
        Some(n) => with_rc(semver::Version::new(major, minor, patch), n),
        None => with_rc(semver::Version::new(major, minor, increment(patch, "patch")?), 1),
      },
    };
    Ok(bumped)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      BumpPart::Major => "major",
      BumpPart::Minor => "minor",
      BumpPart::Patch => "patch",
      BumpPart::Premajor => "premajor",
      BumpPart::Preminor => "preminor",
      BumpPart::Prepatch => "prepatch",
      BumpPart::Prerelease => "prerelease",
    }
  }
}

impl fmt::Display for BumpPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BumpPart {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    BumpPart::ALL
      .into_iter()
      .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| {
        format!(
          "invalid version part '{}' (expected one of: {})",
          s,
          BumpPart::ALL.map(BumpPart::as_str).join(", ")
        )
      })
  }
}

fn with_rc(mut version: semver::Version, n: u64) -> semver::Version {
  // "rc.N" is always a valid pre-release identifier
  version.pre = semver::Prerelease::new(&format!("{}.{}", PRERELEASE_TOKEN, n)).unwrap_or_default();
  version
}

fn increment(component: u64, name: &str) -> Result<u64, String> {
  component
    .checked_add(1)
    .ok_or_else(|| format!("{} version {} cannot be incremented", name, component))
}

/// `rc.N` -> `N + 1`; any other pre-release restarts the counter
fn next_rc_number(pre: &semver::Prerelease) -> Result<Option<u64>, String> {
  if pre.is_empty() {
    return Ok(None);
  }
  let n = pre
    .as_str()
    .strip_prefix(PRERELEASE_TOKEN)
    .and_then(|rest| rest.strip_prefix('.'))
    .and_then(|n| n.parse::<u64>().ok())
    .unwrap_or(0);
  increment(n, PRERELEASE_TOKEN).map(Some)
}

/// How the next version is chosen for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRequest {
  /// Explicit `--new-version`; wins over `part`
  pub explicit: Option<String>,
  pub part: Option<BumpPart>,
}

impl VersionRequest {
  /// Resolve the target version from `current`
  ///
  /// Falls back to a patch bump when nothing was requested.
  pub fn resolve(&self, current: &str) -> Result<semver::Version, String> {
    if let Some(explicit) = &self.explicit {
      let explicit = explicit.trim().trim_start_matches('v');
      return semver::Version::parse(explicit).map_err(|e| format!("invalid new version '{}': {}", explicit, e));
    }

    let current = semver::Version::parse(current.trim())
      .map_err(|e| format!("current version '{}' is not valid semver: {}", current, e))?;
    self.part.unwrap_or(BumpPart::Patch).apply(&current)
  }
}
