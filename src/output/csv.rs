//! CSV score export.
//!
//! Rows are rendered into a `String` first and written in one go. The
//! column layout is consumed by existing spreadsheets, so headers and
//! trailing summary rows are fixed.

use super::prepare_output_path;
use crate::aggregator::{AggregateTotals, TestcaseAggregate};
use crate::compare::{ComparisonResult, RunScorer};
use crate::utils::error::OutputError;
use log::info;
use std::fmt::Write as _;
use std::path::Path;

/// Quote a field that would break the row
fn field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render a score the way existing score files carry it
///
/// Integral values keep a trailing `.0`; non-finite values read `inf`,
/// `-inf` and `nan`.
fn score(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn join_counts(counts: &[i64]) -> String {
    counts
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Render the score file of one matched testcase pair
///
/// **Public** - one file per testcase pair
///
/// Each function takes two rows: its scores with the counts of side `a`,
/// then four empty cells with the counts of side `b`.
pub fn render_pairwise_csv(results: &[ComparisonResult<'_>]) -> String {
    let mut out = String::from("symbol,cdf,kl_div,diff_time,data\n");
    let mut total_cdf = 0.0;
    let mut total_diff_time = 0.0;

    for r in results {
        total_cdf += r.scores.cdf;
        total_diff_time += r.scores.diff_time;
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            field(&r.name),
            score(r.scores.cdf),
            score(r.scores.kl_divergence),
            score(r.scores.diff_time),
            join_counts(&r.counts_a)
        );
        let _ = writeln!(out, ",,,,{}", join_counts(&r.counts_b));
    }

    let _ = writeln!(out, "total cdf,{}", score(total_cdf));
    let _ = writeln!(out, "total diff_time,{}", score(total_diff_time));
    out
}

/// Trailing roll-up rows shared by tuple files and `total.csv`
fn render_total_rows(out: &mut String, totals: &AggregateTotals) {
    for scorer in RunScorer::ALL {
        let _ = writeln!(out, "sum_{},{}", scorer.name(), score(totals.sum_of_means(scorer)));
    }
}

/// Render the score file of one N-way tuple
pub fn render_aggregate_csv(aggregate: &TestcaseAggregate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "cmd: {}", aggregate.command_line);

    out.push_str("symbol,score_total,score_avg");
    for run in 1..=aggregate.runs {
        let _ = write!(out, ",score {}", run);
    }
    out.push_str(",score_y/x,score_1/(x/y),data\n");

    for function in &aggregate.functions {
        let _ = write!(out, "{}", field(&function.name));

        if let Some(total) = function.summary(RunScorer::SumTime) {
            let _ = write!(out, ",{},{}", score(total.sum), score(total.mean));
            for &value in &total.per_run {
                let _ = write!(out, ",{}", score(value));
            }
        }

        let _ = writeln!(
            out,
            ",{},{},{}",
            score(function.mean(RunScorer::YOverX)),
            score(function.mean(RunScorer::InverseXOverY)),
            join_counts(&function.summed_counts)
        );
    }

    render_total_rows(&mut out, &aggregate.totals);
    out
}

/// Render the cross-tuple `total.csv`
pub fn render_totals_csv(totals: &AggregateTotals) -> String {
    let mut out = String::new();
    render_total_rows(&mut out, totals);
    out
}

/// Write rendered CSV text to a file
///
/// # Errors
/// * `OutputError::InvalidPath` - Path is empty, a directory, or its parent cannot be created
/// * `OutputError::WriteFailed` - I/O error during write
pub fn write_csv(contents: &str, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    prepare_output_path(output_path)?;
    std::fs::write(output_path, contents)?;
    info!("Scores written to: {}", output_path.display());
    Ok(())
}
