//! Conformity command implementation.
//!
//! Ranks the caller/callee edges whose sampling frequency differs most
//! between two architectures.

use super::models::ConformityArgs;
use super::utils::{load_sampled_side, resolve_config};
use crate::callgraph::{rank_divergent_edges, EdgeDelta, SampledTrace};
use crate::matcher::find_pairs;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use colored::*;
use log::info;
use serde::Serialize;
use std::fs;

/// Serialized ranking
#[derive(Debug, Serialize)]
struct ConformityReport<'a> {
    version: &'static str,
    generated_at: String,
    testcases: usize,
    edges: &'a [EdgeDelta],
}

/// Execute the conformity command
///
/// **Public** - main entry point called from main.rs
pub fn execute_conformity(args: ConformityArgs) -> Result<()> {
    let config = resolve_config(&args.overrides)?;
    let interval = config.sampling.interval_ns;

    info!("Step 1/3: Rebuilding sampled traces...");
    let traces_a = load_sampled_side(&args.dir_a, interval)?;
    let traces_b = load_sampled_side(&args.dir_b, interval)?;

    info!("Step 2/3: Pairing testcases...");
    let pairing = find_pairs(&traces_a, &traces_b);
    let pairs: Vec<(&SampledTrace, &SampledTrace)> = pairing.pairs;

    info!(
        "Step 3/3: Ranking edges (top {} per testcase, top {} overall)...",
        args.per_testcase, args.top_n
    );
    let edges = rank_divergent_edges(&pairs, args.per_testcase, args.top_n)
        .context("Failed to rank caller/callee edges")?;

    if let Some(path) = &args.output {
        let report = ConformityReport {
            version: SCHEMA_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            testcases: pairs.len(),
            edges: &edges,
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).context("Failed to write conformity report JSON")?;
        println!(
            "📊 Conformity report written to {}",
            path.display().to_string().cyan()
        );
    }

    println!("\n{}", "=".repeat(80));
    println!("CALLER/CALLEE DIVERGENCE ({} testcases)", pairs.len());
    println!("{}", "=".repeat(80));
    for (i, e) in edges.iter().enumerate() {
        println!(
            "{:>3}. {}() -> {}()  {}",
            i + 1,
            e.edge.caller,
            e.edge.callee,
            e.delta
        );
    }
    println!("{}", "=".repeat(80));

    Ok(())
}
