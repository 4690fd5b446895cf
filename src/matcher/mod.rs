//! Cross-run matching.
//!
//! This module handles:
//! - Pairing testcases by command line (two-way and N-way)
//! - Matching functions by resolved name
//! - Matching basic blocks by owning function and source lines

pub mod function;
pub mod testcase;

use crate::parser::TraceRecord;

// Re-export main types
pub use function::{
    match_blocks, match_functions, match_functions_n, BlockMatch, FunctionGroup, FunctionMatch,
    TraceSide,
};
pub use testcase::{find_pairs, find_pairs_n, Pairing};

/// Anything identified by the command line it was collected from
pub trait Testcase {
    fn command_line(&self) -> &str;
}

impl Testcase for TraceRecord {
    fn command_line(&self) -> &str {
        &self.cmdline
    }
}
