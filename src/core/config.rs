//! Configuration for cosmosys (`cosmosys.toml`)
//!
//! Two views of the same file are provided:
//!
//! - [`CosmosysConfig`]: the typed, serde-deserialised configuration used by a
//!   release run.
//! - [`ConfigDocument`]: a lossless `toml_edit` document for `config --get` and
//!   `config --set`, which must not disturb comments or formatting.

use crate::core::error::{ConfigError, CosmosysError, CosmosysResult, ResultExt};
use crate::core::step::StepSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "cosmosys.toml";

/// Configuration for cosmosys
/// Searched in order: cosmosys.toml, .cosmosys.toml, .config/cosmosys.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosmosysConfig {
  pub project: ProjectConfig,
  #[serde(default)]
  pub release: ReleaseSection,
  #[serde(default)]
  pub git: GitConfig,
  #[serde(default)]
  pub changelog: ChangelogConfig,
  #[serde(default)]
  pub version_update: VersionUpdateConfig,
  #[serde(default)]
  pub plugins: PluginsConfig,
  /// Free-form feature switches (`[features]`)
  #[serde(default)]
  pub features: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub repo_name: Option<String>,
  /// Current released version (semver)
  pub version: String,
  #[serde(default)]
  pub project_type: ProjectType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub issue_tracker: Option<String>,
}

/// Project flavour, selects the default version files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
  Python,
  Rust,
  Node,
  #[default]
  Other,
}

impl ProjectType {
  /// Files that carry the version for this project type
  pub fn default_version_files(self) -> &'static [&'static str] {
    match self {
      ProjectType::Python => &["pyproject.toml", "setup.py", "__init__.py"],
      ProjectType::Rust => &["Cargo.toml"],
      ProjectType::Node => &["package.json"],
      ProjectType::Other => &[],
    }
  }
}

/// `[release]` section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReleaseSection {
  /// Ordered step list: bare names or `{ step = "...", condition = "..." }`
  #[serde(default)]
  pub steps: Vec<StepEntry>,

  /// Default values for condition variables; the process environment wins
  #[serde(default)]
  pub variables: BTreeMap<String, String>,
}

/// One entry of `release.steps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepEntry {
  Name(String),
  Detailed {
    step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
  },
}

impl StepEntry {
  pub fn to_spec(&self) -> StepSpec {
    match self {
      StepEntry::Name(name) => StepSpec::new(name.clone()),
      StepEntry::Detailed { step, condition } => StepSpec {
        name: step.clone(),
        condition: condition.clone(),
      },
    }
  }
}

/// `[git]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
  /// Paths passed to `git add` by the git_commit step
  #[serde(default)]
  pub files_to_commit: Vec<String>,

  /// Commit message template (`{version}`, `{name}`)
  #[serde(default = "default_commit_message")]
  pub commit_message: String,

  /// Prefix for release tags (default: "v")
  #[serde(default = "default_tag_prefix")]
  pub tag_prefix: String,

  /// Annotated tag message template
  #[serde(default = "default_commit_message")]
  pub tag_message: String,

  /// Push the release tag after creating it
  #[serde(default)]
  pub push_tags: bool,

  #[serde(default = "default_remote")]
  pub remote: String,
}

fn default_commit_message() -> String {
  "Release {version}".to_string()
}

fn default_tag_prefix() -> String {
  "v".to_string()
}

fn default_remote() -> String {
  "origin".to_string()
}

impl Default for GitConfig {
  fn default() -> Self {
    Self {
      files_to_commit: Vec::new(),
      commit_message: default_commit_message(),
      tag_prefix: default_tag_prefix(),
      tag_message: default_commit_message(),
      push_tags: false,
      remote: default_remote(),
    }
  }
}

/// `[changelog]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogConfig {
  #[serde(default = "default_changelog_file")]
  pub file: String,

  /// Fill the entry from conventional commits since the last tag
  #[serde(default)]
  pub from_commits: bool,
}

fn default_changelog_file() -> String {
  "CHANGELOG.md".to_string()
}

impl Default for ChangelogConfig {
  fn default() -> Self {
    Self {
      file: default_changelog_file(),
      from_commits: false,
    }
  }
}

/// `[version_update]` section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VersionUpdateConfig {
  /// Extra files to rewrite, on top of the project type defaults
  #[serde(default)]
  pub files: Vec<String>,
}

/// `[plugins]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
  /// Directory scanned for executable step plugins (relative to the project root)
  #[serde(default = "default_plugin_dir")]
  pub directory: PathBuf,

  /// Command steps declared inline
  #[serde(default)]
  pub steps: BTreeMap<String, CommandPluginConfig>,
}

fn default_plugin_dir() -> PathBuf {
  PathBuf::from("plugins")
}

impl Default for PluginsConfig {
  fn default() -> Self {
    Self {
      directory: default_plugin_dir(),
      steps: BTreeMap::new(),
    }
  }
}

/// `[plugins.steps.<name>]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandPluginConfig {
  /// Program and arguments; `{version}` and `{name}` are substituted
  pub command: Vec<String>,

  /// Compensating command, run on rollback
  #[serde(default)]
  pub rollback: Vec<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl CosmosysConfig {
  /// Find config file in search order: cosmosys.toml, .cosmosys.toml, .config/cosmosys.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join(CONFIG_FILE_NAME),
      path.join(".cosmosys.toml"),
      path.join(".config").join(CONFIG_FILE_NAME),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Resolve an explicit `--config` path or search from `cwd`
  pub fn resolve_path(explicit: Option<&Path>, cwd: &Path) -> CosmosysResult<PathBuf> {
    if let Some(path) = explicit {
      let path = if path.is_absolute() { path.to_path_buf() } else { cwd.join(path) };
      if !path.exists() {
        return Err(CosmosysError::with_help(
          format!("Configuration file not found: {}", path.display()),
          "Check the --config path or run `cosmosys config --init`.",
        ));
      }
      return Ok(path);
    }

    Self::find_config_path(cwd).ok_or_else(|| {
      CosmosysError::Config(ConfigError::NotFound {
        search_root: cwd.to_path_buf(),
      })
    })
  }

  /// Load and validate a config file
  pub fn load(config_path: &Path) -> CosmosysResult<Self> {
    let content = fs::read_to_string(config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config = Self::parse(&content).with_context(|| format!("Failed to parse config from {}", config_path.display()))?;
    Ok(config)
  }

  /// Parse config from TOML text
  pub fn parse(content: &str) -> CosmosysResult<Self> {
    let config: CosmosysConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Structural validation that serde cannot express
  pub fn validate(&self) -> CosmosysResult<()> {
    if self.project.name.trim().is_empty() {
      return Err(ConfigError::MissingField {
        field: "project.name".to_string(),
      }
      .into());
    }

    for (idx, entry) in self.release.steps.iter().enumerate() {
      if entry.to_spec().name.trim().is_empty() {
        return Err(
          ConfigError::InvalidValue {
            field: format!("release.steps[{}]", idx),
            reason: "step name must not be empty".to_string(),
          }
          .into(),
        );
      }
    }

    Ok(())
  }

  /// Normalised step list
  pub fn step_specs(&self) -> Vec<StepSpec> {
    self.release.steps.iter().map(StepEntry::to_spec).collect()
  }

  pub fn is_feature_enabled(&self, feature: &str) -> bool {
    self.features.get(feature).copied().unwrap_or(false)
  }

  /// Serialise to TOML
  pub fn to_toml_string(&self) -> CosmosysResult<String> {
    toml_edit::ser::to_string_pretty(self)
      .map_err(|e| CosmosysError::message(format!("TOML serialization error: {}", e)))
  }

  /// Write config to the given path
  pub fn save(&self, config_path: &Path) -> CosmosysResult<()> {
    let content = self.to_toml_string()?;
    fs::write(config_path, content).with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(())
  }

  /// Build a starting configuration from the project files found in `root`
  ///
  /// Cargo.toml wins over package.json, which wins over pyproject.toml/setup.py.
  pub fn detect(root: &Path) -> CosmosysResult<Self> {
    let fallback_name = root
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_else(|| "project".to_string());

    let (project_type, name, version) = if root.join("Cargo.toml").exists() {
      let (name, version) = read_toml_identity(&root.join("Cargo.toml"), "package")?;
      (ProjectType::Rust, name, version)
    } else if root.join("package.json").exists() {
      let content = fs::read_to_string(root.join("package.json"))?;
      let json: serde_json::Value = serde_json::from_str(&content).context("Failed to parse package.json")?;
      let name = json.get("name").and_then(|v| v.as_str()).map(String::from);
      let version = json.get("version").and_then(|v| v.as_str()).map(String::from);
      (ProjectType::Node, name, version)
    } else if root.join("pyproject.toml").exists() {
      let (name, version) = read_toml_identity(&root.join("pyproject.toml"), "project")?;
      (ProjectType::Python, name, version)
    } else if root.join("setup.py").exists() {
      (ProjectType::Python, None, None)
    } else {
      (ProjectType::Other, None, None)
    };

    let version_file = match project_type {
      ProjectType::Rust => Some("Cargo.toml"),
      ProjectType::Node => Some("package.json"),
      ProjectType::Python => Some("pyproject.toml"),
      ProjectType::Other => None,
    };

    let mut files_to_commit = vec![CONFIG_FILE_NAME.to_string(), default_changelog_file()];
    if let Some(file) = version_file {
      files_to_commit.insert(0, file.to_string());
    }

    Ok(Self {
      project: ProjectConfig {
        name: name.unwrap_or(fallback_name),
        repo_name: None,
        version: version.unwrap_or_else(|| "0.1.0".to_string()),
        project_type,
        issue_tracker: None,
      },
      release: ReleaseSection {
        steps: ["version_update", "changelog_update", "git_commit", "git_tag"]
          .into_iter()
          .map(|s| StepEntry::Name(s.to_string()))
          .collect(),
        variables: BTreeMap::new(),
      },
      git: GitConfig {
        files_to_commit,
        ..GitConfig::default()
      },
      changelog: ChangelogConfig::default(),
      version_update: VersionUpdateConfig::default(),
      plugins: PluginsConfig::default(),
      features: BTreeMap::new(),
    })
  }
}

fn read_toml_identity(path: &Path, table: &str) -> CosmosysResult<(Option<String>, Option<String>)> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  let doc: toml_edit::DocumentMut = content
    .parse()
    .with_context(|| format!("Failed to parse {}", path.display()))?;
  let field = |key: &str| {
    doc
      .get(table)
      .and_then(|t| t.get(key))
      .and_then(|v| v.as_str())
      .map(String::from)
  };
  Ok((field("name"), field("version")))
}

/// Lossless view of the config file for key-level reads and writes
pub struct ConfigDocument {
  path: PathBuf,
  doc: toml_edit::DocumentMut,
}

impl ConfigDocument {
  pub fn load(path: &Path) -> CosmosysResult<Self> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read config from {}", path.display()))?;
    let doc = content
      .parse::<toml_edit::DocumentMut>()
      .with_context(|| format!("Failed to parse config from {}", path.display()))?;
    Ok(Self {
      path: path.to_path_buf(),
      doc,
    })
  }

  /// Look up a dotted key (e.g. `git.push_tags`) and render its value
  pub fn get(&self, key: &str) -> CosmosysResult<String> {
    let mut item = self.doc.as_item();
    for part in key.split('.') {
      item = item.get(part).ok_or_else(|| ConfigError::KeyNotFound { key: key.to_string() })?;
    }
    Ok(render_item(item))
  }

  /// Set a dotted key, creating intermediate tables as needed
  ///
  /// `true`/`false` become booleans, integers stay integers, everything else
  /// is stored as a string.
  pub fn set(&mut self, key: &str, raw: &str) -> CosmosysResult<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.trim().is_empty()) {
      return Err(CosmosysError::message(format!("Invalid configuration key '{}'", key)));
    }
    let Some((last, parents)) = parts.split_last() else {
      return Err(CosmosysError::message("Configuration key must not be empty"));
    };

    let mut table: &mut dyn toml_edit::TableLike = self.doc.as_table_mut();
    for part in parents {
      table = table
        .entry(part)
        .or_insert(toml_edit::table())
        .as_table_like_mut()
        .ok_or_else(|| {
          CosmosysError::Config(ConfigError::InvalidValue {
            field: key.to_string(),
            reason: format!("'{}' is not a table", part),
          })
        })?;
    }

    table.insert(last, toml_edit::value(parse_scalar(raw)));
    Ok(())
  }

  /// Flatten every leaf into `dotted.key = value` pairs (document order)
  pub fn flatten(&self) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_table(self.doc.as_table(), "", &mut out);
    out
  }

  /// Check the edited document still deserialises
  pub fn validate(&self) -> CosmosysResult<CosmosysConfig> {
    CosmosysConfig::parse(&self.doc.to_string())
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn save(&self) -> CosmosysResult<()> {
    fs::write(&self.path, self.doc.to_string())
      .with_context(|| format!("Failed to write config to {}", self.path.display()))?;
    Ok(())
  }
}

fn parse_scalar(raw: &str) -> toml_edit::Value {
  match raw {
    "true" => toml_edit::Value::from(true),
    "false" => toml_edit::Value::from(false),
    _ => match raw.parse::<i64>() {
      Ok(n) => toml_edit::Value::from(n),
      Err(_) => toml_edit::Value::from(raw),
    },
  }
}

fn render_item(item: &toml_edit::Item) -> String {
  match item.as_value() {
    Some(value) => match value.as_str() {
      Some(s) => s.to_string(),
      None => value.to_string().trim().to_string(),
    },
    None => item.to_string().trim().to_string(),
  }
}

fn flatten_table(table: &dyn toml_edit::TableLike, prefix: &str, out: &mut Vec<(String, String)>) {
  for (key, item) in table.iter() {
    let full = if prefix.is_empty() {
      key.to_string()
    } else {
      format!("{}.{}", prefix, key)
    };
    match item.as_table_like() {
      Some(nested) if !item.is_inline_table() => flatten_table(nested, &full, out),
      _ => out.push((full, render_item(item))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"
[project]
name = "TestProject"
repo_name = "test/repo"
version = "1.0.0"
project_type = "python"

[release]
steps = [
  "version_update",
  { step = "changelog_update", condition = "${CHANGELOG:-true}" },
  "git_commit",
]

[release.variables]
CHANGELOG = "false"

[features]
changelog = true
"#;

  #[test]
  fn test_parse_valid_config() {
    let config = CosmosysConfig::parse(SAMPLE).unwrap();
    assert_eq!(config.project.name, "TestProject");
    assert_eq!(config.project.project_type, ProjectType::Python);
    assert!(config.is_feature_enabled("changelog"));
    assert!(!config.is_feature_enabled("missing"));

    let specs = config.step_specs();
    assert_eq!(specs.len(), 3);
    assert_eq!(specs[0], StepSpec::new("version_update"));
    assert_eq!(specs[1].condition.as_deref(), Some("${CHANGELOG:-true}"));
    assert_eq!(config.release.variables.get("CHANGELOG").map(String::as_str), Some("false"));
  }

  #[test]
  fn test_defaults_applied() {
    let config = CosmosysConfig::parse("[project]\nname = \"x\"\nversion = \"0.1.0\"\n").unwrap();
    assert_eq!(config.git.commit_message, "Release {version}");
    assert_eq!(config.git.tag_prefix, "v");
    assert_eq!(config.git.remote, "origin");
    assert_eq!(config.changelog.file, "CHANGELOG.md");
    assert_eq!(config.plugins.directory, PathBuf::from("plugins"));
    assert_eq!(config.project.project_type, ProjectType::Other);
    assert!(config.release.steps.is_empty());
  }

  #[test]
  fn test_missing_version_is_rejected() {
    let err = CosmosysConfig::parse("[project]\nname = \"x\"\n").unwrap_err();
    assert!(err.to_string().contains("version"), "{}", err);
  }

  #[test]
  fn test_empty_step_name_is_rejected() {
    let err = CosmosysConfig::parse("[project]\nname = \"x\"\nversion = \"1.0.0\"\n[release]\nsteps = [\"\"]\n")
      .unwrap_err();
    assert!(err.to_string().contains("release.steps[0]"));
  }

  #[test]
  fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    let config = CosmosysConfig::parse(SAMPLE).unwrap();
    config.save(&path).unwrap();

    let loaded = CosmosysConfig::load(&path).unwrap();
    assert_eq!(loaded.project.name, config.project.name);
    assert_eq!(loaded.release.steps, config.release.steps);
    assert_eq!(loaded.features, config.features);
  }

  #[test]
  fn test_find_config_path_order() {
    let dir = tempfile::tempdir().unwrap();
    assert!(CosmosysConfig::find_config_path(dir.path()).is_none());

    fs::create_dir_all(dir.path().join(".config")).unwrap();
    fs::write(dir.path().join(".config").join(CONFIG_FILE_NAME), "").unwrap();
    fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();
    assert_eq!(
      CosmosysConfig::find_config_path(dir.path()).unwrap(),
      dir.path().join(CONFIG_FILE_NAME)
    );
  }

  #[test]
  fn test_detect_rust_project() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
      dir.path().join("Cargo.toml"),
      "[package]\nname = \"demo\"\nversion = \"0.3.1\"\n",
    )
    .unwrap();

    let config = CosmosysConfig::detect(dir.path()).unwrap();
    assert_eq!(config.project.project_type, ProjectType::Rust);
    assert_eq!(config.project.name, "demo");
    assert_eq!(config.project.version, "0.3.1");
    assert_eq!(config.git.files_to_commit[0], "Cargo.toml");
    assert_eq!(config.release.steps.len(), 4);
  }

  #[test]
  fn test_detect_node_project() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("package.json"), r#"{"name": "web", "version": "2.0.0"}"#).unwrap();

    let config = CosmosysConfig::detect(dir.path()).unwrap();
    assert_eq!(config.project.project_type, ProjectType::Node);
    assert_eq!(config.project.version, "2.0.0");
  }

  #[test]
  fn test_document_get_set_preserves_comments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
      &path,
      "# release settings\n[project]\nname = \"x\" # inline\nversion = \"1.0.0\"\n",
    )
    .unwrap();

    let mut doc = ConfigDocument::load(&path).unwrap();
    assert_eq!(doc.get("project.version").unwrap(), "1.0.0");
    assert!(doc.get("project.nope").is_err());

    doc.set("project.version", "1.1.0").unwrap();
    doc.set("git.push_tags", "true").unwrap();
    doc.save().unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("# release settings"));
    assert!(written.contains("# inline"));

    let reloaded = ConfigDocument::load(&path).unwrap();
    assert_eq!(reloaded.get("project.version").unwrap(), "1.1.0");
    assert_eq!(reloaded.get("git.push_tags").unwrap(), "true");
  }

  #[test]
  fn test_set_through_scalar_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[project]\nname = \"x\"\nversion = \"1.0.0\"\n").unwrap();

    let mut doc = ConfigDocument::load(&path).unwrap();
    assert!(doc.set("project.name.first", "y").is_err());
    assert!(doc.set("project..name", "y").is_err());
  }

  #[test]
  fn test_flatten_lists_leaves() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, SAMPLE).unwrap();

    let doc = ConfigDocument::load(&path).unwrap();
    let flat = doc.flatten();
    let keys: Vec<&str> = flat.iter().map(|(k, _)| k.as_str()).collect();
    assert!(keys.contains(&"project.name"));
    assert!(keys.contains(&"release.steps"));
    assert!(keys.contains(&"release.variables.CHANGELOG"));
    assert!(keys.contains(&"features.changelog"));
  }
}
