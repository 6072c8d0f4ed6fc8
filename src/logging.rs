//! Terminal logging
//!
//! Release progress is recorded in the [`ReleaseLog`](crate::core::context::ReleaseLog)
//! and forwarded to `tracing`; this module installs the subscriber that
//! prints it. `RUST_LOG` overrides the level chosen from `--verbose`.
//!
//! ```bash
//! RUST_LOG=cosmosys=trace cosmosys release --dry-run
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directive for a verbosity flag
pub fn default_directive(verbose: bool) -> &'static str {
  if verbose { "cosmosys=debug" } else { "cosmosys=info" }
}

/// Install the stderr subscriber; safe to call more than once
pub fn init(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

  let _ = tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .compact(),
    )
    .try_init();
}
