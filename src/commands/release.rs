//! `cosmosys release`: plan the configured steps, run them, report the outcome

use super::GlobalOptions;
use cosmosys::core::error::{CosmosysError, CosmosysResult, ExitCode};
use cosmosys::core::pipeline::{Inclusion, ReleaseOutcome, ReleasePlan};
use cosmosys::core::step::StepState;
use cosmosys::release::{BumpPart, VersionRequest};
use cosmosys::{Environment, ReleaseContext, ReleaseManager};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Flags of the `release` subcommand
#[derive(Debug, Clone, Default)]
pub struct ReleaseArgs {
  pub dry_run: bool,
  pub part: Option<BumpPart>,
  pub new_version: Option<String>,
  pub interactive: bool,
  pub json: bool,
}

/// Run the release command
///
/// Exits with [`ExitCode::ReleaseFailed`] when a step fails, whatever the
/// rollback did.
pub fn run_release(global: &GlobalOptions, args: ReleaseArgs) -> CosmosysResult<()> {
  let session = global.session()?;
  let (registry, _plugins) = session.registry()?;

  let request = VersionRequest {
    explicit: args.new_version.clone(),
    part: args.part,
  };
  // A bad --new-version is a usage error, not a step failure
  if request.explicit.is_some() {
    request.resolve(&session.config.project.version).map_err(|e| {
      CosmosysError::with_help(
        format!("Invalid --new-version: {}", e),
        "Pass a semantic version such as 1.4.0 or v1.4.0.",
      )
    })?;
  }

  let env = Environment::from_process().with_defaults(&session.config.release.variables);
  let specs = session.config.step_specs();
  let manager = ReleaseManager::new(&registry);
  let mut plan = manager.plan(&specs, &env)?;

  if !args.json {
    print_header(&session.config.project.name, &session.config.project.version, &request, &args);
    print_plan(&plan);
  }

  if plan.steps.is_empty() && !args.json {
    println!("⚠️  No release steps configured");
    println!();
    println!("Add steps to cosmosys.toml:");
    println!("  [release]");
    println!("  steps = [\"version_update\", \"changelog_update\", \"git_commit\", \"git_tag\"]");
    println!();
  }

  if args.interactive {
    select_steps(&mut plan);
  }

  let mut ctx = ReleaseContext::new(Arc::new(session.config), &session.root)
    .with_config_path(session.config_path)
    .with_dry_run(args.dry_run)
    .with_verbose(global.verbose)
    .with_version_request(request);

  let outcome = manager.execute(&plan, &mut ctx);

  if args.json {
    println!("{}", serde_json::to_string_pretty(&outcome)?);
  } else {
    print_summary(&outcome, &ctx.release_version());
  }

  if !outcome.succeeded {
    std::process::exit(ExitCode::ReleaseFailed.as_i32());
  }
  Ok(())
}

fn print_header(name: &str, current: &str, request: &VersionRequest, args: &ReleaseArgs) {
  println!("🚀 Releasing {} {}", name, current);
  match request.resolve(current) {
    Ok(target) => println!("   Target version: {}", target),
    Err(e) => println!("   ⚠️  Cannot compute target version: {}", e),
  }
  if args.dry_run {
    println!("   🔍 Dry-run mode (no changes will be made)");
  }
  println!();
}

fn print_plan(plan: &ReleasePlan) {
  if plan.steps.is_empty() {
    return;
  }

  println!("📋 Plan:");
  for (idx, planned) in plan.steps.iter().enumerate() {
    let condition = planned
      .spec
      .condition
      .as_deref()
      .map(|c| format!("  [when {}]", c))
      .unwrap_or_default();
    match planned.inclusion {
      Inclusion::Included => println!("   {}. {}{}", idx + 1, planned.spec.name, condition),
      _ => println!("   {}. {} (skipped){}", idx + 1, planned.spec.name, condition),
    }
  }
  println!();
}

/// Ask about every included step; answering no deselects it
fn select_steps(plan: &mut ReleasePlan) {
  let stdin = io::stdin();
  let mut input = stdin.lock();

  let included: Vec<(usize, String)> = plan
    .steps
    .iter()
    .enumerate()
    .filter(|(_, p)| p.is_included())
    .map(|(idx, p)| (idx, p.spec.name.clone()))
    .collect();

  for (idx, name) in included {
    if !confirm(&mut input, &format!("Execute step '{}'?", name)) {
      plan.deselect(idx);
    }
  }
  eprintln!();
}

/// `[Y/n]` prompt on stderr; anything but an explicit no is yes
fn confirm(input: &mut impl BufRead, prompt: &str) -> bool {
  eprint!("❓ {} [Y/n] ", prompt);
  let _ = io::stderr().flush();

  let mut answer = String::new();
  match input.read_line(&mut answer) {
    Ok(0) | Err(_) => true,
    Ok(_) => !matches!(answer.trim().to_ascii_lowercase().as_str(), "n" | "no"),
  }
}

fn print_summary(outcome: &ReleaseOutcome, version: &str) {
  println!();
  for report in &outcome.steps {
    let icon = match (report.inclusion, report.state) {
      (Inclusion::SkippedByCondition, _) => "⊘",
      (Inclusion::Deselected, _) => "⊖",
      (_, StepState::Succeeded) => "✅",
      (_, StepState::Failed) => "❌",
      (_, StepState::RolledBack) => "↩️ ",
      _ => "·",
    };
    match &report.message {
      Some(message) => println!("  {} {}: {}", icon, report.name, message),
      None => println!("  {} {}", icon, report.name),
    }
  }
  println!();

  if outcome.succeeded {
    let verb = if outcome.dry_run { "Dry run of release" } else { "Release" };
    println!(
      "🎉 {} {} completed ({} step(s) executed, {} skipped)",
      verb,
      version,
      outcome.executed_steps.len(),
      outcome.skipped_steps.len()
    );
    return;
  }

  if let Some(failure) = &outcome.failure {
    println!("❌ Release failed at step '{}': {}", failure.step, failure.message);
  }
  if outcome.rolled_back_steps.is_empty() {
    println!("   Nothing to roll back");
  } else {
    println!("   Rolled back: {}", outcome.rolled_back_steps.join(" → "));
  }
  for warning in &outcome.rollback_warnings {
    println!("   ⚠️  Rollback of '{}' incomplete: {}", warning.step, warning.message);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[test]
  fn test_confirm_defaults_to_yes() {
    assert!(confirm(&mut Cursor::new(""), "Execute step 'x'?"));
    assert!(confirm(&mut Cursor::new("\n"), "Execute step 'x'?"));
    assert!(confirm(&mut Cursor::new("y\n"), "Execute step 'x'?"));
    assert!(!confirm(&mut Cursor::new("n\n"), "Execute step 'x'?"));
    assert!(!confirm(&mut Cursor::new(" No \n"), "Execute step 'x'?"));
  }
}
