//! `cosmosys plugins`: inspect loaded plugins

use super::GlobalOptions;
use cosmosys::core::error::{CosmosysError, CosmosysResult};
use cosmosys::plugins::{PluginInfo, PluginKind};

/// Run the plugins command: one plugin with `info`, otherwise the list
pub fn run_plugins(global: &GlobalOptions, info: Option<String>, json: bool) -> CosmosysResult<()> {
  let session = global.session()?;
  let (_registry, plugins) = session.registry()?;

  if let Some(name) = info {
    let plugin = plugins.get(&name).ok_or_else(|| {
      let known: Vec<&str> = plugins.plugins().iter().map(|p| p.name.as_str()).collect();
      CosmosysError::with_help(
        format!("Plugin '{}' not found", name),
        if known.is_empty() {
          "No plugins are loaded.".to_string()
        } else {
          format!("Loaded plugins: {}", known.join(", "))
        },
      )
    })?;

    if json {
      println!("{}", serde_json::to_string_pretty(plugin)?);
    } else {
      print_info(plugin);
    }
    return Ok(());
  }

  if json {
    println!("{}", serde_json::to_string_pretty(plugins.plugins())?);
    return Ok(());
  }

  if plugins.plugins().is_empty() {
    println!("🔌 No plugins loaded");
    println!();
    println!("Declare a command step in cosmosys.toml:");
    println!("  [plugins.steps.notify]");
    println!("  command = [\"./scripts/notify.sh\", \"{{version}}\"]");
    println!();
    println!("or add an executable to {}/", session.config.plugins.directory.display());
    return Ok(());
  }

  println!("🔌 Plugins:");
  for plugin in plugins.plugins() {
    println!("  {:<20} {:<9} {}", plugin.name, kind_label(plugin.kind), describe(plugin));
  }
  Ok(())
}

fn print_info(plugin: &PluginInfo) {
  println!("🔌 {}", plugin.name);
  println!("   Kind:        {}", kind_label(plugin.kind));
  println!("   Description: {}", describe(plugin));
  if let Some(source) = &plugin.source {
    println!("   Source:      {}", source.display());
  }
  println!("   Steps:       {}", plugin.steps.join(", "));
}

fn describe(plugin: &PluginInfo) -> &str {
  if plugin.description.is_empty() {
    "No description available"
  } else {
    &plugin.description
  }
}

fn kind_label(kind: PluginKind) -> &'static str {
  match kind {
    PluginKind::Command => "command",
    PluginKind::Directory => "directory",
    PluginKind::Library => "library",
  }
}
