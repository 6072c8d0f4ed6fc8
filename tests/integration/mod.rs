//! Integration tests driving the `cosmosys` binary in temporary git repositories

mod helpers;
mod test_config;
mod test_plugins;
mod test_release;
