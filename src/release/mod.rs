//! Release-domain helpers used by the built-in steps
//!
//! - **version**: Semver bumping (`major` ... `prerelease`) and target resolution
//! - **files**: Version rewriting for TOML, JSON, Python and plain text files
//! - **changelog**: Changelog entry rendering and insertion

pub mod changelog;
pub mod files;
pub mod version;

pub use version::{BumpPart, VersionRequest};
