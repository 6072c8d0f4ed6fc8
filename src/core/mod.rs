//! Core engine for cosmosys releases
//!
//! - **condition**: `${VAR:-default}` gating expressions
//! - **config**: cosmosys.toml parsing, detection and key-level editing
//! - **context**: Mutable state shared by the steps of one run
//! - **environment**: Variable snapshot used by conditions
//! - **error**: Error types with contextual help messages and exit codes
//! - **git**: Git CLI operations used by the release steps
//! - **pipeline**: Planning, sequential execution and rollback
//! - **process**: External process boundary
//! - **registry**: Step name -> constructor catalog
//! - **step**: The `Step` capability and its state machine

pub mod condition;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod git;
pub mod pipeline;
pub mod process;
pub mod registry;
pub mod step;

pub use context::{LogLevel, ReleaseContext, ReleaseLog};
pub use environment::Environment;
pub use error::{CosmosysError, CosmosysResult, ResultExt};
pub use pipeline::{ReleaseManager, ReleaseOutcome, ReleasePlan};
pub use registry::{StepOrigin, StepRegistry};
pub use step::{Step, StepResult, StepSpec, StepState};
