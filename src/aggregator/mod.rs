//! Aggregation of repeated runs into per-function score summaries.
//!
//! This module turns N traces of the same testcase into:
//! - Per-run scores of every run scorer
//! - Per-function sums, means and summed counts
//! - Testcase and cross-testcase totals

pub mod aggregate;

// Re-export main types and functions
pub use aggregate::{
    aggregate_groups, aggregate_testcase, grand_totals, AggregateTotals, FunctionAggregate,
    ScorerSummary, ScorerTotal, TestcaseAggregate,
};
