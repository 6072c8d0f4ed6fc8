//! `cosmosys config`: show, read, write or initialise the configuration

use super::GlobalOptions;
use cosmosys::core::config::{CONFIG_FILE_NAME, ConfigDocument, CosmosysConfig};
use cosmosys::core::error::{CosmosysError, CosmosysResult};
use std::env;

/// Run the config command
///
/// `--init` runs first, then `--set`, then `--get`; without any flag the
/// flattened configuration is printed.
pub fn run_config(
  global: &GlobalOptions,
  get: Option<String>,
  set: Option<String>,
  value: Option<String>,
  init: bool,
  force: bool,
) -> CosmosysResult<()> {
  if init {
    run_init(global, force)?;
  }

  if get.is_none() && set.is_none() {
    if !init {
      show(global)?;
    }
    return Ok(());
  }

  let session = global.session()?;
  let mut doc = ConfigDocument::load(&session.config_path)?;

  if let (Some(key), Some(value)) = (set, value) {
    doc.set(&key, &value)?;
    // Refuse to write a file the next run could not load
    doc.validate().map_err(|e| e.context(format!("Setting '{}' would make the configuration invalid", key)))?;
    doc.save()?;
    println!("✅ Set {} = {}", key, value);
  }

  if let Some(key) = get {
    println!("{}: {}", key, doc.get(&key)?);
  }

  Ok(())
}

fn run_init(global: &GlobalOptions, force: bool) -> CosmosysResult<()> {
  let cwd = env::current_dir()?;
  let path = match &global.config {
    Some(explicit) if explicit.is_absolute() => explicit.clone(),
    Some(explicit) => cwd.join(explicit),
    None => cwd.join(CONFIG_FILE_NAME),
  };

  if path.exists() && !force {
    return Err(CosmosysError::with_help(
      format!("Configuration already exists: {}", path.display()),
      "Use --force to overwrite it.",
    ));
  }

  let config = CosmosysConfig::detect(&cwd)?;
  config.save(&path)?;

  println!("✅ Initialized {}", path.display());
  println!("   Project: {} {} ({:?})", config.project.name, config.project.version, config.project.project_type);
  println!(
    "   Steps:   {}",
    config
      .step_specs()
      .iter()
      .map(|s| s.name.as_str())
      .collect::<Vec<_>>()
      .join(", ")
  );
  Ok(())
}

fn show(global: &GlobalOptions) -> CosmosysResult<()> {
  let session = global.session()?;
  let doc = ConfigDocument::load(&session.config_path)?;
  let entries = doc.flatten();

  println!("⚙️  Configuration ({})", session.config_path.display());
  println!();
  let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
  for (key, value) in entries {
    println!("  {:width$}  {}", key, value, width = width);
  }
  Ok(())
}
