//! Terminal output rendering for triage reports.
//!
//! Provides a human-readable summary of a comparison run with visual
//! cues for regressions and undefined baselines.

use crate::compare::{ComparisonResult, TriageReport};
use colored::*;

/// Rows shown per section
const MAX_ROWS: usize = 10;

/// Render a human-readable summary of a triage report for the terminal
pub fn render_terminal_summary(report: &TriageReport<'_>) -> String {
    let mut out = String::new();

    out.push_str(&render_header(report));
    out.push_str(&render_regressed(&report.regressed));
    out.push_str(&render_degenerate(&report.degenerate));
    out.push_str(&render_status(report));

    out
}

fn render_header(report: &TriageReport<'_>) -> String {
    let mut out = String::new();
    out.push_str("\n📊 ");
    out.push_str(&"Cross-Architecture Triage Summary".bold().to_string());
    out.push_str("\n---------------------------------------------------\n");
    out.push_str(&format!("Method:    {:?}\n", report.method));
    out.push_str(&format!("Threshold: {}\n", report.threshold));
    out.push_str(&format!(
        "Compared:  {} matches in {} testcases\n",
        report.summary.compared, report.testcases
    ));
    out.push_str("---------------------------------------------------\n");
    out
}

fn render_regressed(results: &[ComparisonResult<'_>]) -> String {
    let mut out = String::new();
    if results.is_empty() {
        return out;
    }

    out.push_str("\nTop Regressions:\n");
    for r in results.iter().take(MAX_ROWS) {
        let ratio = r
            .scores
            .ratio
            .map(|x| format!("{:+.2}", x))
            .unwrap_or_else(|| "n/a".to_string());
        out.push_str(&format!(
            "  📈 {} [{}] ratio {} (ks p={:.3})\n",
            r.name, r.testcase, ratio, r.scores.ks.p_value
        ));
        if let Some(file) = r.source_hint.as_ref().and_then(|h| h.file.as_deref()) {
            out.push_str(&format!("     {}\n", file.dimmed()));
        }
    }
    if results.len() > MAX_ROWS {
        out.push_str(&format!("  ... and {} more\n", results.len() - MAX_ROWS));
    }
    out
}

fn render_degenerate(results: &[ComparisonResult<'_>]) -> String {
    let mut out = String::new();
    if results.is_empty() {
        return out;
    }

    out.push_str("\nUndefined Ratios (zero baseline):\n");
    for r in results.iter().take(MAX_ROWS) {
        out.push_str(&format!("  ➡️  {} [{}]\n", r.name, r.testcase));
    }
    out
}

fn render_status(report: &TriageReport<'_>) -> String {
    let mut out = String::new();
    out.push_str("\n---------------------------------------------------\n");
    let status_msg = if report.summary.regressed > 0 {
        format!(
            "❌ STATUS: {} REGRESSED, {} acceptable",
            report.summary.regressed, report.summary.acceptable
        )
        .red()
        .bold()
    } else if report.summary.degenerate > 0 {
        format!(
            "⚠️  STATUS: NO REGRESSIONS ({} undefined ratios)",
            report.summary.degenerate
        )
        .yellow()
        .bold()
    } else {
        "✅ STATUS: NO REGRESSIONS".green().bold()
    };
    out.push_str(&status_msg.to_string());
    out.push('\n');
    out
}
