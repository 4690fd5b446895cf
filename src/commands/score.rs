//! Score command implementation.
//!
//! Writes one CSV per matched testcase pair with the CDF, KL and
//! weighted-time difference of every name-matched function.

use super::models::ScoreArgs;
use super::utils::{load_side, report_unmatched};
use crate::compare::Comparator;
use crate::matcher::{find_pairs, TraceSide};
use crate::output::{render_pairwise_csv, write_csv};
use crate::utils::config::AnalysisConfig;
use anyhow::{Context, Result};
use log::info;

/// Execute the score command
///
/// **Public** - main entry point called from main.rs
///
/// Every function present in both traces is scored, whatever its bucket
/// population.
pub fn execute_score(args: ScoreArgs) -> Result<()> {
    info!("Step 1/3: Decoding traces...");
    let mut config = AnalysisConfig::default();
    config.compare.min_populated_buckets = 0;

    let side_a = load_side(&args.dir_a, &args.data_dir)
        .with_context(|| format!("Failed to load {}", args.dir_a.display()))?;
    let side_b = load_side(&args.dir_b, &args.data_dir)
        .with_context(|| format!("Failed to load {}", args.dir_b.display()))?;

    info!("Step 2/3: Pairing testcases...");
    let pairing = find_pairs(&side_a.records, &side_b.records);
    report_unmatched("first set", pairing.unmatched_a.iter().copied());
    report_unmatched("second set", pairing.unmatched_b.iter().copied());

    info!("Step 3/3: Scoring {} testcases...", pairing.pairs.len());
    let comparator = Comparator::new(&config);
    for (i, &(a, b)) in pairing.pairs.iter().enumerate() {
        let results = comparator
            .compare_functions(TraceSide::new(a, &side_a.store), TraceSide::new(b, &side_b.store))
            .with_context(|| format!("Failed to score {}", a.display_name()))?;

        let path = args.output_dir.join(format!("{}.csv", i));
        write_csv(&render_pairwise_csv(&results), &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    info!("✓ Scores written to: {}", args.output_dir.display());
    Ok(())
}
