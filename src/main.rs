mod commands;

use clap::{Parser, Subcommand};
use commands::{GlobalOptions, ReleaseArgs};
use cosmosys::core::error::{CosmosysError, print_error};
use cosmosys::release::BumpPart;
use std::path::PathBuf;

/// Ordered, conditional release steps with dry-run and rollback
#[derive(Parser)]
#[command(name = "cosmosys")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Path to the configuration file (default: search for cosmosys.toml)
  #[arg(long, global = true, value_name = "PATH")]
  config: Option<PathBuf>,

  /// Show debug output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the configured release steps
  Release {
    /// Show what every step would do without changing anything
    #[arg(long)]
    dry_run: bool,
    /// Version part to bump (default: patch)
    #[arg(long, value_enum, conflicts_with = "new_version")]
    part: Option<BumpPart>,
    /// Release this exact version instead of bumping
    #[arg(long, value_name = "VERSION")]
    new_version: Option<String>,
    /// Confirm each step before the release starts
    #[arg(short, long)]
    interactive: bool,
    /// Print the release outcome as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show or edit cosmosys.toml
  Config {
    /// Print one value (dotted key, e.g. git.tag_prefix)
    #[arg(long, value_name = "KEY")]
    get: Option<String>,
    /// Set a value (requires --value)
    #[arg(long, value_name = "KEY", requires = "value")]
    set: Option<String>,
    /// Value for --set
    #[arg(long, requires = "set")]
    value: Option<String>,
    /// Create cosmosys.toml from the project files in this directory
    #[arg(long)]
    init: bool,
    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    force: bool,
  },

  /// Inspect loaded plugins
  Plugins {
    /// List loaded plugins (default)
    #[arg(long, conflicts_with = "info")]
    list: bool,
    /// Show details for one plugin
    #[arg(long, value_name = "NAME")]
    info: Option<String>,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// List every registered release step
  Steps {
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Magenta))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Magenta))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Cyan))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();
  cosmosys::logging::init(cli.verbose);

  let global = GlobalOptions {
    config: cli.config,
    verbose: cli.verbose,
  };

  let result = match cli.command {
    Commands::Release {
      dry_run,
      part,
      new_version,
      interactive,
      json,
    } => commands::run_release(
      &global,
      ReleaseArgs {
        dry_run,
        part,
        new_version,
        interactive,
        json,
      },
    ),
    Commands::Config {
      get,
      set,
      value,
      init,
      force,
    } => commands::run_config(&global, get, set, value, init, force),
    Commands::Plugins { list: _, info, json } => commands::run_plugins(&global, info, json),
    Commands::Steps { json } => commands::run_steps(&global, json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: CosmosysError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
