//! Aggregate command implementation.
//!
//! Scores every function common to N runs of the same testcase and writes
//! one CSV per testcase plus a `total.csv` with the cross-testcase sums.

use super::models::AggregateArgs;
use super::utils::{load_side, LoadedSide};
use crate::aggregator::{aggregate_testcase, grand_totals, TestcaseAggregate};
use crate::compare::RunScorer;
use crate::matcher::{find_pairs_n, TraceSide};
use crate::output::{render_aggregate_csv, render_totals_csv, write_csv};
use crate::parser::TraceRecord;
use anyhow::{bail, Context, Result};
use log::info;

/// Execute the aggregate command
///
/// **Public** - main entry point called from main.rs
pub fn execute_aggregate(args: AggregateArgs) -> Result<()> {
    if args.dirs.len() < 2 {
        bail!("aggregate needs at least two data directories");
    }

    info!("Step 1/3: Decoding {} trace sets...", args.dirs.len());
    let sides: Vec<LoadedSide> = args
        .dirs
        .iter()
        .map(|dir| {
            info!("Reading data under {}", dir.display());
            load_side(dir, &args.data_dir).with_context(|| format!("Failed to load {}", dir.display()))
        })
        .collect::<Result<_>>()?;

    info!("Step 2/3: Matching testcases across every set...");
    let sets: Vec<&[TraceRecord]> = sides.iter().map(|s| s.records.as_slice()).collect();
    let groups = find_pairs_n(&sets).context("Failed to match testcases")?;
    info!("{} testcases common to every set", groups.len());

    info!("Step 3/3: Computing scores...");
    let mut aggregates: Vec<TestcaseAggregate> = Vec::with_capacity(groups.len());
    for (i, group) in groups.iter().enumerate() {
        let trace_sides: Vec<TraceSide<'_>> = group
            .iter()
            .zip(&sides)
            .map(|(&record, side)| TraceSide::new(record, &side.store))
            .collect();

        let aggregate = aggregate_testcase(&trace_sides, 0).with_context(|| {
            let name = group.first().map(|r| r.display_name()).unwrap_or_default();
            format!("Failed to aggregate {}", name)
        })?;

        let path = args.output_dir.join(format!("{}.csv", i));
        write_csv(&render_aggregate_csv(&aggregate), &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        aggregates.push(aggregate);
    }

    let totals = grand_totals(&aggregates);
    let path = args.output_dir.join("total.csv");
    write_csv(&render_totals_csv(&totals), &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        "sum_total {} over {} testcases",
        totals.sum_of_means(RunScorer::SumTime),
        aggregates.len()
    );
    info!("✓ Scores written to: {}", args.output_dir.display());
    Ok(())
}
