//! Call-graph reconstruction from sampled stacks.
//!
//! This module handles:
//! - Resolving per-sample call chains through the call-path tree
//! - Rebuilding per-symbol active-time histograms by diffing chains
//! - Loading sampled-trace databases into trace records
//! - Caller/callee conformity between architectures

pub mod activity;
pub mod callpath;
pub mod conformity;
pub mod perf_db;

// Re-export main types
pub use activity::{accumulate_activity, align_down};
pub use callpath::{resolve_chain, resolve_samples, CallPath, CallPathArena, CallSample, ResolvedSample};
pub use conformity::{edge_deltas, edge_frequencies, rank_divergent_edges, CallEdge, EdgeCounts, EdgeDelta};
pub use perf_db::{
    build_sampled_trace, find_command_line, from_database, histograms_to_record, read_database,
    SampleDatabase, SampledTrace,
};
