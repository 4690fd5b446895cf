//! Statistical comparison of matched histograms.
//!
//! This module handles:
//! - The closed set of pair and per-run scorers
//! - The Kolmogorov-Smirnov shape test
//! - Classifying matches and building the triage report

pub mod engine;
pub mod ks;
pub mod schema;
pub mod scorer;

// Re-export main types
pub use engine::{build_report, declared_line, dedup_by_name, Comparator};
pub use ks::{compare_histograms, normalized_points, two_sample, weighted_two_sample, KsOutcome};
pub use schema::{ComparisonResult, Scores, SourceHint, TriageReport, TriageSummary, Verdict};
pub use scorer::{
    cdf, diff_time, inverse_x_over_y, kl_divergence, rel_entr, sum_time, time_ratio,
    weighted_time, y_over_x, CountVector, PairScorer, RunScorer,
};
