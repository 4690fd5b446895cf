//! Sampled command implementation.
//!
//! Rebuilds per-function histograms from perf-exported sample databases of
//! both architectures and triages them like instrumented traces.

use super::compare::finish_report;
use super::models::SampledArgs;
use super::utils::{load_sampled_side, resolve_config};
use crate::callgraph::SampledTrace;
use crate::compare::{build_report, Comparator, ComparisonResult};
use crate::matcher::{find_pairs, TraceSide};
use crate::parser::write_trace;
use crate::utils::config::TRACE_FILE_PREFIX;
use anyhow::{bail, Context, Result};
use colored::*;
use log::{info, warn};
use std::path::Path;
use std::time::Instant;

/// Execute the sampled command
///
/// **Public** - main entry point called from main.rs
pub fn execute_sampled(args: SampledArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Step 1/4: Resolving configuration...");
    let config = resolve_config(&args.overrides)?;
    let interval = config.sampling.interval_ns;

    info!("Step 2/4: Rebuilding sampled traces ({}ns buckets)...", interval);
    let traces_a = load_sampled_side(&args.dir_a, interval)?;
    let traces_b = load_sampled_side(&args.dir_b, interval)?;

    if let Some(dir) = &args.export_dir {
        export_traces(&traces_a, &dir.join("a"))?;
        export_traces(&traces_b, &dir.join("b"))?;
        println!(
            "📦 Rebuilt traces written to {}",
            dir.display().to_string().cyan()
        );
    }

    info!("Step 3/4: Pairing testcases...");
    let pairing = find_pairs(&traces_a, &traces_b);
    for t in pairing.unmatched_a.iter().chain(&pairing.unmatched_b) {
        warn!("No matching testcase for {}", t.record.display_name());
    }

    info!("Step 4/4: Scoring {} testcases...", pairing.pairs.len());
    let comparator = Comparator::new(&config);
    let mut results: Vec<ComparisonResult<'_>> = Vec::new();
    for &(a, b) in &pairing.pairs {
        let side_a = TraceSide::new(&a.record, &a.symbols);
        let side_b = TraceSide::new(&b.record, &b.symbols);
        match comparator.compare_functions(side_a, side_b) {
            Ok(r) => results.extend(r),
            Err(e) => warn!("Skipping testcase {}: {}", a.record.display_name(), e),
        }
    }

    let report = build_report(results, comparator.config(), pairing.pairs.len());
    finish_report(&report, args.output.as_deref(), args.summary)?;

    info!("Sampled triage completed in {:.2}s", start_time.elapsed().as_secs_f64());

    if args.fail_on_regression && report.summary.regressed > 0 {
        bail!("{} regressions detected", report.summary.regressed);
    }
    Ok(())
}

/// Write rebuilt traces as `trec_perf_*` files named after their databases
fn export_traces(traces: &[SampledTrace], dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create directory {}", dir.display()))?;

    for (i, trace) in traces.iter().enumerate() {
        let stem = trace
            .record
            .source_path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| i.to_string());
        let path = dir.join(format!("{}{}", TRACE_FILE_PREFIX, stem));
        write_trace(&trace.record, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
