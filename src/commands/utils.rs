//! Input discovery and helpers shared by the commands.

use super::models::{ConfigOverrides, DEBUGINFO_DIR};
use crate::callgraph::{build_sampled_trace, SampledTrace};
use crate::lookup::{referenced_modules, DebugInfoStore};
use crate::parser::{decode_batch, TraceRecord};
use crate::utils::config::{load_config, AnalysisConfig, SCHEMA_VERSION, TRACE_FILE_PREFIX};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Decoded traces of one architecture together with their debug info
#[derive(Debug)]
pub struct LoadedSide {
    pub records: Vec<TraceRecord>,
    pub store: DebugInfoStore,
}

/// Build the effective configuration
///
/// The configuration file is read first, then command-line values replace
/// the matching fields.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<AnalysisConfig> {
    let mut config = match &overrides.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if let Some(threshold) = overrides.threshold {
        config.compare.threshold = threshold;
    }
    if let Some(method) = overrides.method {
        config.compare.method = method;
    }
    if let Some(prefix) = &overrides.prefix {
        config.source.prefix = prefix.clone();
    }
    if let Some(min) = overrides.min_populated_buckets {
        config.compare.min_populated_buckets = min;
    }
    if let Some(interval) = overrides.interval_ns {
        config.sampling.interval_ns = interval;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Make sure a directory exists before anything is read from it
fn check_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    Ok(())
}

/// List files in `dir` whose name satisfies `keep`, sorted by path
fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    check_dir(dir)?;
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.file_name().and_then(|n| n.to_str()).is_some_and(&keep) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Every `trec_perf_*` file directly under `dir`
pub fn collect_trace_files(dir: &Path) -> Result<Vec<PathBuf>> {
    list_files(dir, |name| name.starts_with(TRACE_FILE_PREFIX))
}

/// Decode the traces of one architecture and open its debug info
///
/// **Public** - shared entry point of the trace-based commands
///
/// # Arguments
/// * `dir` - Architecture data directory
/// * `data_dir` - Trace subdirectory inside `dir`
///
/// # Errors
/// * No trace files, or none decodes
/// * Debug-info directory missing, or a referenced module has no store
pub fn load_side(dir: &Path, data_dir: &str) -> Result<LoadedSide> {
    let trace_dir = dir.join(data_dir);
    let files = collect_trace_files(&trace_dir)?;
    if files.is_empty() {
        bail!("{} has no data files", trace_dir.display());
    }

    let batch = decode_batch(&files)
        .with_context(|| format!("Failed to decode traces under {}", trace_dir.display()))?;
    if !batch.failures.is_empty() {
        warn!(
            "{}: {} trace files skipped",
            trace_dir.display(),
            batch.failures.len()
        );
    }

    let store = open_store(dir)?;
    for record in &batch.records {
        store
            .ensure_modules(&referenced_modules(record))
            .with_context(|| format!("Missing debug info for {}", record.display_name()))?;
    }

    Ok(LoadedSide {
        records: batch.records,
        store,
    })
}

/// Open the debug-info stores of an architecture directory
pub fn open_store(dir: &Path) -> Result<DebugInfoStore> {
    let debuginfo = dir.join(DEBUGINFO_DIR);
    check_dir(&debuginfo)?;
    DebugInfoStore::open(&debuginfo)
        .with_context(|| format!("Failed to open debug info under {}", debuginfo.display()))
}

/// Sample databases and raw dumps of one architecture directory
///
/// Looks for `perf_data/sqlite/*perf.data*.db` and `perf_data/raw/*perf.data*.raw`.
pub fn collect_sampled_inputs(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let data = dir.join("perf_data");
    let dbs = list_files(&data.join("sqlite"), |n| n.contains("perf.data") && n.ends_with(".db"))?;
    let raws = list_files(&data.join("raw"), |n| n.contains("perf.data") && n.ends_with(".raw"))?;

    if dbs.is_empty() || raws.is_empty() {
        bail!("Sampled data files under {} are incomplete", data.display());
    }
    Ok((dbs, raws))
}

/// Rebuild every sampled trace of one architecture directory
///
/// A database that cannot be rebuilt is skipped with a warning; the side
/// fails only when nothing is left.
pub fn load_sampled_side(dir: &Path, interval: u32) -> Result<Vec<SampledTrace>> {
    let (dbs, raws) = collect_sampled_inputs(dir)?;
    let mut traces = Vec::with_capacity(dbs.len());

    for db in &dbs {
        match build_sampled_trace(db, &raws, interval) {
            Ok(trace) => traces.push(trace),
            Err(e) => warn!("Skipping {}: {}", db.display(), e),
        }
    }

    if traces.is_empty() {
        bail!("None of the {} sample databases under {} could be rebuilt", dbs.len(), dir.display());
    }

    info!("Rebuilt {} of {} sampled traces under {}", traces.len(), dbs.len(), dir.display());
    Ok(traces)
}

/// Log testcases that found no partner
pub fn report_unmatched<'a>(side: &str, unmatched: impl IntoIterator<Item = &'a TraceRecord>) {
    for record in unmatched {
        warn!("{}: no matching testcase for {}", side, record.display_name());
    }
}

/// Display version information
pub fn display_version() {
    println!("xarch-perf v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Cross-architecture performance triage from execution-time histograms.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::CompareMethod;

    #[test]
    fn test_overrides_replace_defaults() {
        let overrides = ConfigOverrides {
            threshold: Some(0.3),
            method: Some(CompareMethod::Distribution),
            ..Default::default()
        };
        let config = resolve_config(&overrides).unwrap();
        assert_eq!(config.compare.threshold, 0.3);
        assert_eq!(config.compare.method, CompareMethod::Distribution);
        assert_eq!(config.sampling.interval_ns, 5000);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let overrides = ConfigOverrides {
            interval_ns: Some(0),
            ..Default::default()
        };
        assert!(resolve_config(&overrides).is_err());
    }

    #[test]
    fn test_collect_trace_files_filters_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("trec_perf_2"), b"").unwrap();
        fs::write(dir.path().join("trec_perf_1"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let files = collect_trace_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["trec_perf_1", "trec_perf_2"]);
    }

    #[test]
    fn test_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_trace_files(&dir.path().join("absent")).is_err());
    }
}
