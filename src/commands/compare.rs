//! Compare command implementation.
//!
//! The compare command:
//! 1. Resolves the analysis configuration
//! 2. Decodes the traces of both architectures and opens their debug info
//! 3. Pairs testcases by command line
//! 4. Scores every matched function (or basic block)
//! 5. Builds and writes the triage report

use super::models::{CompareArgs, Granularity};
use super::utils::{load_side, report_unmatched, resolve_config};
use crate::compare::{build_report, Comparator, ComparisonResult, TriageReport};
use crate::matcher::{find_pairs, TraceSide};
use crate::output::{render_terminal_summary, write_report};
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::time::Instant;

/// Execute the compare (or blocks) command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Missing or undecodable inputs, missing debug info
/// * Report write errors
/// * Any regression when `fail_on_regression` is set
pub fn execute_compare(args: CompareArgs) -> Result<()> {
    let start_time = Instant::now();

    info!(
        "Comparing {} against {}",
        args.dir_a.display(),
        args.dir_b.display()
    );

    info!("Step 1/5: Resolving configuration...");
    let config = resolve_config(&args.overrides)?;
    debug!("Configuration: {:?}", config);

    info!("Step 2/5: Decoding traces...");
    let side_a = load_side(&args.dir_a, &args.data_dir_a)
        .with_context(|| format!("Failed to load {}", args.dir_a.display()))?;
    let side_b = load_side(&args.dir_b, &args.data_dir_b)
        .with_context(|| format!("Failed to load {}", args.dir_b.display()))?;

    if args.granularity == Granularity::Blocks {
        for record in side_a.records.iter().chain(&side_b.records) {
            if !record.mode.is_block_mode() {
                bail!(
                    "{} was collected in {} mode, not basic-block mode",
                    record.display_name(),
                    record.mode.label()
                );
            }
        }
    }

    info!("Step 3/5: Pairing testcases...");
    let pairing = find_pairs(&side_a.records, &side_b.records);
    report_unmatched("first set", pairing.unmatched_a.iter().copied());
    report_unmatched("second set", pairing.unmatched_b.iter().copied());
    info!("{} testcases matched", pairing.pairs.len());

    info!("Step 4/5: Scoring matches...");
    let comparator = Comparator::new(&config);
    let mut results: Vec<ComparisonResult<'_>> = Vec::new();
    for &(a, b) in &pairing.pairs {
        let a = TraceSide::new(a, &side_a.store);
        let b = TraceSide::new(b, &side_b.store);
        let matched = match args.granularity {
            Granularity::Functions => comparator.compare_functions(a, b),
            Granularity::Blocks => comparator.compare_blocks(a, b),
        };
        match matched {
            Ok(r) => results.extend(r),
            Err(e) => warn!("Skipping testcase {}: {}", a.record.display_name(), e),
        }
    }

    info!("Step 5/5: Building report...");
    let report = build_report(results, comparator.config(), pairing.pairs.len());
    finish_report(&report, args.output.as_deref(), args.summary)?;

    let elapsed = start_time.elapsed();
    info!("Compare completed in {:.2}s", elapsed.as_secs_f64());

    if args.fail_on_regression && report.summary.regressed > 0 {
        bail!("{} regressions detected", report.summary.regressed);
    }

    Ok(())
}

/// Write and print a finished report
///
/// **Public** - shared with the sampled command
pub fn finish_report(
    report: &TriageReport<'_>,
    output: Option<&std::path::Path>,
    summary: bool,
) -> Result<()> {
    info!(
        "{} regressed, {} acceptable, {} undefined ratios",
        report.summary.regressed, report.summary.acceptable, report.summary.degenerate
    );

    if let Some(path) = output {
        write_report(report, path).context("Failed to write triage report JSON")?;
        info!("✓ Report written to: {}", path.display());
    }

    if summary {
        println!("{}", render_terminal_summary(report));
    }

    Ok(())
}
