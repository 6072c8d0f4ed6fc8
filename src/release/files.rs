//! Version rewriting for project files
//!
//! The rewrite rule is picked from the file extension:
//!
//! - `.toml`: first string found at `version`, `package.version`,
//!   `project.version` or `workspace.package.version` (format preserved)
//! - `.json`: top-level `"version"` (key order preserved)
//! - `.py`: `__version__ = "..."`
//! - anything else: every occurrence of the old version string

use crate::core::error::{CosmosysError, CosmosysResult, ResultExt};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item};

/// Candidate version keys in TOML files, in lookup order
pub const TOML_VERSION_PATHS: [&[&str]; 4] = [
  &["version"],
  &["package", "version"],
  &["project", "version"],
  &["workspace", "package", "version"],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFileKind {
  Toml,
  Json,
  Python,
  Text,
}

impl VersionFileKind {
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some("toml") => VersionFileKind::Toml,
      Some("json") => VersionFileKind::Json,
      Some("py") => VersionFileKind::Python,
      _ => VersionFileKind::Text,
    }
  }
}

/// Rewrite the version in `content`
///
/// Returns `None` when the file carries no recognisable version.
pub fn rewrite_version(kind: VersionFileKind, content: &str, old: &str, new: &str) -> CosmosysResult<Option<String>> {
  match kind {
    VersionFileKind::Toml => rewrite_toml(content, new),
    VersionFileKind::Json => rewrite_json(content, new),
    VersionFileKind::Python => rewrite_python(content, new),
    VersionFileKind::Text => Ok(content.contains(old).then(|| content.replace(old, new))),
  }
}

fn rewrite_toml(content: &str, new: &str) -> CosmosysResult<Option<String>> {
  let mut doc: DocumentMut = content.parse()?;

  let Some(path) = TOML_VERSION_PATHS
    .iter()
    .find(|path| lookup(doc.as_item(), path).is_some_and(Item::is_str))
  else {
    return Ok(None);
  };

  let Some(value) = lookup_mut(doc.as_item_mut(), path).and_then(Item::as_value_mut) else {
    return Ok(None);
  };
  let decor = value.decor().clone();
  *value = toml_edit::Value::from(new);
  *value.decor_mut() = decor;

  Ok(Some(doc.to_string()))
}

fn lookup<'a>(item: &'a Item, path: &[&str]) -> Option<&'a Item> {
  path.iter().try_fold(item, |item, key| item.get(*key))
}

fn lookup_mut<'a>(item: &'a mut Item, path: &[&str]) -> Option<&'a mut Item> {
  path.iter().try_fold(item, |item, key| item.get_mut(*key))
}

fn rewrite_json(content: &str, new: &str) -> CosmosysResult<Option<String>> {
  let mut json: serde_json::Value = serde_json::from_str(content)?;
  let Some(version) = json.get_mut("version").filter(|v| v.is_string()) else {
    return Ok(None);
  };
  *version = serde_json::Value::String(new.to_string());

  let mut out = serde_json::to_string_pretty(&json)?;
  if content.ends_with('\n') {
    out.push('\n');
  }
  Ok(Some(out))
}

fn rewrite_python(content: &str, new: &str) -> CosmosysResult<Option<String>> {
  let re = Regex::new(r#"__version__(\s*)=(\s*)["'][^"'\n]*["']"#)?;
  if !re.is_match(content) {
    return Ok(None);
  }
  let replacement = format!("__version__${{1}}=${{2}}\"{}\"", new);
  Ok(Some(re.replace_all(content, replacement.as_str()).into_owned()))
}

/// Rewrite one file in place; `Ok(false)` when it has no version to update
pub fn update_file(path: &Path, old: &str, new: &str) -> CosmosysResult<bool> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  let kind = VersionFileKind::from_path(path);
  let Some(updated) =
    rewrite_version(kind, &content, old, new).with_context(|| format!("Failed to update version in {}", path.display()))?
  else {
    return Ok(false);
  };
  fs::write(path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(true)
}

/// Original bytes of a file, for restoring on rollback
#[derive(Debug, Clone)]
pub struct FileSnapshot {
  path: PathBuf,
  contents: Option<Vec<u8>>,
}

impl FileSnapshot {
  /// Capture `path`; a missing file is remembered as missing
  pub fn capture(path: &Path) -> CosmosysResult<Self> {
    let contents = match fs::read(path) {
      Ok(bytes) => Some(bytes),
      Err(e) if e.kind() == io::ErrorKind::NotFound => None,
      Err(e) => return Err(CosmosysError::from(e).context(format!("Failed to back up {}", path.display()))),
    };
    Ok(Self {
      path: path.to_path_buf(),
      contents,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Put the captured state back
  pub fn restore(&self) -> CosmosysResult<()> {
    match &self.contents {
      Some(bytes) => fs::write(&self.path, bytes).with_context(|| format!("Failed to restore {}", self.path.display())),
      None => match fs::remove_file(&self.path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
          Err(CosmosysError::from(e).context(format!("Failed to remove {}", self.path.display())))
        }
        _ => Ok(()),
      },
    }
  }
}
