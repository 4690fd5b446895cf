//! xarch-perf
//!
//! Cross-architecture performance triage from per-function
//! execution-time histograms.
//!
//! This crate provides the core implementation for the
//! `xarch-perf` CLI tool:
//!
//! - [`parser`] decodes and encodes the binary trace format
//! - [`callgraph`] rebuilds histograms from sampled call stacks
//! - [`lookup`] names symbols through debug-info stores
//! - [`matcher`] pairs testcases, functions and basic blocks across runs
//! - [`compare`] scores matches and classifies regressions
//! - [`aggregator`] folds repeated runs into score summaries
//! - [`output`] writes reports and score exports
//!
//! ## Getting Started
//!
//! ```bash
//! xarch-perf compare perf_trec_pkg_x86_64 perf_trec_pkg_riscv64 -o report.json
//! xarch-perf --help
//! ```

pub mod aggregator;
pub mod callgraph;
pub mod commands;
pub mod compare;
pub mod lookup;
pub mod matcher;
pub mod output;
pub mod parser;
pub mod utils;
