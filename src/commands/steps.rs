//! `cosmosys steps`: every registered step and its origin

use super::GlobalOptions;
use cosmosys::core::error::CosmosysResult;

pub fn run_steps(global: &GlobalOptions, json: bool) -> CosmosysResult<()> {
  let session = global.session()?;
  let (registry, _plugins) = session.registry()?;

  if json {
    let infos: Vec<_> = registry.iter().collect();
    println!("{}", serde_json::to_string_pretty(&infos)?);
    return Ok(());
  }

  let configured: Vec<String> = session.config.step_specs().into_iter().map(|s| s.name).collect();

  println!("🧩 Registered steps ({}):", registry.len());
  for info in registry.iter() {
    let marker = if configured.contains(&info.name) { "●" } else { " " };
    println!("  {} {:<20} {:<28} {}", marker, info.name, info.origin.to_string(), info.description);
  }
  println!();
  println!("  ● used by release.steps");
  Ok(())
}
