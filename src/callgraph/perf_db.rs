//! Ingestion of sampled traces exported to SQLite.
//!
//! Each testcase is one database with `samples`, `symbols` and `call_paths`
//! tables, plus a raw text dump whose `# cmdline :` header carries the
//! command line the samples were taken from.

use super::activity::accumulate_activity;
use super::callpath::{resolve_samples, CallPath, CallPathArena, CallSample, ResolvedSample};
use crate::lookup::SymbolTable;
use crate::matcher::Testcase;
use crate::parser::{CollectionMode, Histogram, TraceRecord};
use crate::utils::config::{CMDLINE_MARKER, UNKNOWN_SYMBOL};
use crate::utils::error::CallGraphError;
use log::{debug, info};
use rusqlite::{Connection, OpenFlags};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Raw tables of one sampled-trace database
#[derive(Debug, Clone)]
pub struct SampleDatabase {
    pub path: PathBuf,
    /// Ordered by timestamp, then sample id
    pub samples: Vec<CallSample>,
    pub symbols: SymbolTable,
    pub call_paths: CallPathArena,
}

/// A sampled trace rebuilt into the trace-record shape
#[derive(Debug, Clone)]
pub struct SampledTrace {
    /// Mode `SampledPerf`, symbol ids local to this database
    pub record: TraceRecord,
    pub symbols: SymbolTable,
    /// Resolved chains in sample order, kept for conformity analysis
    pub chains: Vec<Vec<u64>>,
}

impl Testcase for SampledTrace {
    fn command_line(&self) -> &str {
        &self.record.cmdline
    }
}

/// Read the three tables of a sampled-trace database
///
/// Sample id 0 is the exporter's placeholder row and is skipped.
///
/// # Errors
/// * `CallGraphError::Database` - the file is not a readable export
pub fn read_database(path: impl AsRef<Path>) -> Result<SampleDatabase, CallGraphError> {
    let path = path.as_ref();
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let mut stmt = conn.prepare(
        "SELECT id, comm_id, dso_id, symbol_id, ip, time, call_path_id
         FROM samples WHERE id != 0 ORDER BY time, id",
    )?;
    let samples = stmt
        .query_map([], |row| {
            Ok(CallSample {
                sample_id: row.get::<_, i64>(0)? as u64,
                command_id: row.get::<_, i64>(1)? as u64,
                module_id: row.get::<_, i64>(2)? as u64,
                symbol_id: row.get::<_, i64>(3)? as u64,
                ip: row.get::<_, i64>(4)? as u64,
                timestamp: row.get::<_, i64>(5)? as u64,
                call_path_id: row.get::<_, i64>(6)? as u64,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare("SELECT id, name FROM symbols")?;
    let symbols = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?))
        })?
        .collect::<Result<SymbolTable, _>>()?;

    let mut stmt = conn.prepare("SELECT id, parent_id, symbol_id FROM call_paths")?;
    let call_paths = stmt
        .query_map([], |row| {
            Ok(CallPath {
                id: row.get::<_, i64>(0)? as u64,
                parent_id: row.get::<_, i64>(1)? as u64,
                symbol_id: row.get::<_, i64>(2)? as u64,
            })
        })?
        .collect::<Result<CallPathArena, _>>()?;

    debug!(
        "{}: {} samples, {} symbols, {} call paths",
        path.display(),
        samples.len(),
        symbols.len(),
        call_paths.len()
    );

    Ok(SampleDatabase {
        path: path.to_path_buf(),
        samples,
        symbols,
        call_paths,
    })
}

/// Find the command line for a database among the raw text dumps
///
/// The dump is the one whose file name contains the database's file stem.
///
/// # Errors
/// * `CallGraphError::MissingCommandLine` - no dump matches, or the matching
///   dump has no `# cmdline :` line
pub fn find_command_line(db_path: &Path, raw_paths: &[PathBuf]) -> Result<String, CallGraphError> {
    let missing = || CallGraphError::MissingCommandLine(db_path.display().to_string());

    let stem = db_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.strip_suffix(".db").unwrap_or(n))
        .ok_or_else(missing)?;

    let raw = raw_paths
        .iter()
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(stem))
        })
        .ok_or_else(missing)?;

    let reader = BufReader::new(File::open(raw)?);
    for line in reader.lines() {
        let line = line?;
        if let Some(pos) = line.find(CMDLINE_MARKER) {
            return Ok(line[pos + CMDLINE_MARKER.len()..].trim().to_string());
        }
    }

    Err(missing())
}

/// Build a dense trace record from activity histograms
///
/// Bucket count is one past the highest populated bucket across all symbols.
///
/// # Errors
/// * `CallGraphError::BucketOverflow` - an activation lies beyond the last
///   bucket a trace can describe
pub fn histograms_to_record(
    cmdline: impl Into<String>,
    histograms: &BTreeMap<u64, Histogram>,
    interval: u32,
) -> Result<TraceRecord, CallGraphError> {
    let width = u64::from(interval.max(1));
    let widest = histograms
        .values()
        .filter_map(|h| h.keys().next_back())
        .map(|&start| start / width + 1)
        .max()
        .unwrap_or(0);
    let buckets = u32::try_from(widest).map_err(|_| CallGraphError::BucketOverflow {
        start: (widest - 1) * width,
        interval,
    })?;

    let mut record = TraceRecord::new(cmdline, CollectionMode::SampledPerf, None, buckets, interval);
    for (&symbol, histogram) in histograms {
        let mut counts = vec![0i64; buckets as usize];
        for (&start, &count) in histogram {
            let slot = usize::try_from(start / width)
                .ok()
                .and_then(|j| counts.get_mut(j))
                .ok_or(CallGraphError::BucketOverflow { start, interval })?;
            *slot += count;
        }
        record.insert_counts(symbol, counts);
    }
    Ok(record)
}

/// Rebuild one sampled trace
///
/// **Public** - main entry point for sampled ingestion
///
/// # Arguments
/// * `db_path` - Exported sample database
/// * `raw_paths` - Candidate raw dumps for the command line
/// * `interval` - Bucket width in nanoseconds
///
/// # Errors
/// Any `CallGraphError`; a broken stream voids the whole testcase.
pub fn build_sampled_trace(
    db_path: &Path,
    raw_paths: &[PathBuf],
    interval: u32,
) -> Result<SampledTrace, CallGraphError> {
    let db = read_database(db_path)?;
    let cmdline = find_command_line(db_path, raw_paths)?;
    from_database(&db, cmdline, interval)
}

/// Resolve, accumulate and densify an already-loaded database
pub fn from_database(
    db: &SampleDatabase,
    cmdline: String,
    interval: u32,
) -> Result<SampledTrace, CallGraphError> {
    let resolved: Vec<ResolvedSample> = resolve_samples(&db.samples, &db.symbols, &db.call_paths)?;
    let mut histograms = accumulate_activity(&resolved, interval)?;
    histograms.retain(|&symbol, _| db.symbols.get(symbol) != Some(UNKNOWN_SYMBOL));

    let mut record = histograms_to_record(cmdline, &histograms, interval)?;
    record.source_path = db.path.clone();

    info!(
        "{}: {} symbols over {} buckets",
        db.path.display(),
        record.symbols.len(),
        record.buckets
    );

    Ok(SampledTrace {
        record,
        symbols: db.symbols.clone(),
        chains: resolved.into_iter().map(|s| s.chain).collect(),
    })
}
