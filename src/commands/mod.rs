//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod aggregate;
pub mod compare;
pub mod conformity;
pub mod dump;
pub mod models;
pub mod sampled;
pub mod score;
pub mod utils;

// Re-export main command functions
pub use aggregate::execute_aggregate;
pub use compare::execute_compare;
pub use conformity::execute_conformity;
pub use dump::execute_dump;
pub use models::{
    AggregateArgs, CompareArgs, ConfigOverrides, ConformityArgs, DumpArgs, Granularity,
    SampledArgs, ScoreArgs,
};
pub use sampled::execute_sampled;
pub use score::execute_score;
pub use utils::display_version;
