//! Output writers for triage reports and score exports.
//!
//! This module handles writing data to disk in various formats:
//! - JSON triage reports (pretty printed)
//! - CSV score exports (pairwise, N-way and totals)
//! - Colored terminal summaries

pub mod csv;
pub mod json;
pub mod terminal;

use crate::utils::error::OutputError;
use log::debug;
use std::path::Path;

// Re-export main functions
pub use csv::{render_aggregate_csv, render_pairwise_csv, render_totals_csv, write_csv};
pub use json::{read_report, report_to_string, write_report};
pub use terminal::render_terminal_summary;

/// Validate an output path and create its parent directories
///
/// **Private** - shared by every file writer
///
/// # Errors
/// * `OutputError::InvalidPath` - Path is empty, a directory, or its parent cannot be created
pub(crate) fn prepare_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}
