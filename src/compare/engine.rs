//! Comparison engine.
//!
//! Scores matched functions and blocks of two traces, classifies each one
//! and assembles the triage report.

use super::ks::compare_histograms;
use super::schema::{ComparisonResult, Scores, SourceHint, TriageReport, TriageSummary, Verdict};
use super::scorer::{cdf, diff_time, kl_divergence, time_ratio, CountVector};
use crate::lookup::{LineRange, SymbolLookup};
use crate::matcher::{match_blocks, match_functions, TraceSide};
use crate::parser::SymbolSeries;
use crate::utils::config::{AnalysisConfig, CompareConfig, CompareMethod, SCHEMA_VERSION};
use crate::utils::error::{MatchError, ScoreError};
use log::{debug, warn};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Scores and classifies matches under one configuration
#[derive(Debug, Clone)]
pub struct Comparator {
    compare: CompareConfig,
    source_prefix: String,
}

impl Comparator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            compare: config.compare.clone(),
            source_prefix: config.source.prefix.clone(),
        }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.compare
    }

    /// Compute every score of one pair of series
    ///
    /// Returns the scores, the verdict and whether the baseline was degenerate.
    pub fn score(
        &self,
        a: &SymbolSeries,
        interval_a: u32,
        b: &SymbolSeries,
        interval_b: u32,
    ) -> (Scores, Verdict, bool) {
        let va = CountVector::new(&a.counts, interval_a);
        let vb = CountVector::new(&b.counts, interval_b);

        let (ratio, degenerate) = match time_ratio(va, vb) {
            Ok(r) => (Some(r), false),
            Err(ScoreError::DegenerateBaseline { .. }) => (None, true),
        };
        let ks = compare_histograms(&a.histogram, &b.histogram);

        let verdict = match self.compare.method {
            CompareMethod::WeightedTime => match ratio {
                Some(r) if r >= self.compare.threshold => Verdict::Regressed,
                _ => Verdict::Acceptable,
            },
            CompareMethod::Distribution => {
                if ks.is_divergent() {
                    Verdict::Regressed
                } else {
                    Verdict::Acceptable
                }
            }
        };

        let scores = Scores {
            ratio,
            ks,
            cdf: cdf(&a.counts, &b.counts),
            kl_divergence: kl_divergence(&a.counts, &b.counts),
            diff_time: diff_time(va, vb),
        };
        (scores, verdict, degenerate)
    }

    /// Compare the name-matched functions of one testcase pair
    ///
    /// **Public** - main entry point for function comparison
    ///
    /// # Errors
    /// * `MatchError::Lookup` - a symbol could not be named
    pub fn compare_functions<'a>(
        &self,
        a: TraceSide<'a>,
        b: TraceSide<'a>,
    ) -> Result<Vec<ComparisonResult<'a>>, MatchError> {
        let testcase = a.record.display_name();
        let matches = match_functions(a, b, self.compare.min_populated_buckets)?;

        let results: Vec<ComparisonResult<'a>> = matches
            .into_iter()
            .map(|m| {
                let hint = self.source_hint(a.lookup, &m.name, m.id_a, None);
                self.build_result(
                    m.name,
                    &testcase,
                    (m.id_a, m.series_a, a.record.interval),
                    (m.id_b, m.series_b, b.record.interval),
                    hint,
                )
            })
            .collect();

        debug!("{}: compared {} functions", testcase, results.len());
        Ok(results)
    }

    /// Compare the line-matched blocks of one testcase pair
    ///
    /// # Errors
    /// * `MatchError::Lookup` - a block could not be resolved
    pub fn compare_blocks<'a>(
        &self,
        a: TraceSide<'a>,
        b: TraceSide<'a>,
    ) -> Result<Vec<ComparisonResult<'a>>, MatchError> {
        let testcase = a.record.display_name();
        let matches = match_blocks(a, b, self.compare.min_populated_buckets)?;

        let results: Vec<ComparisonResult<'a>> = matches
            .into_iter()
            .map(|m| {
                let hint = self.source_hint(a.lookup, &m.function, m.function_a, Some(m.lines));
                self.build_result(
                    m.function,
                    &testcase,
                    (m.block_a, m.series_a, a.record.interval),
                    (m.block_b, m.series_b, b.record.interval),
                    hint,
                )
            })
            .collect();

        debug!("{}: compared {} blocks", testcase, results.len());
        Ok(results)
    }

    fn build_result<'a>(
        &self,
        name: String,
        testcase: &str,
        (id_a, series_a, interval_a): (u64, &'a SymbolSeries, u32),
        (id_b, series_b, interval_b): (u64, &'a SymbolSeries, u32),
        source_hint: SourceHint,
    ) -> ComparisonResult<'a> {
        let (scores, verdict, degenerate) = self.score(series_a, interval_a, series_b, interval_b);
        if degenerate {
            warn!("{} in {}: baseline weighted time is zero, ratio undefined", name, testcase);
        }

        ComparisonResult {
            name,
            testcase: testcase.to_string(),
            id_a,
            id_b,
            counts_a: Cow::Borrowed(&series_a.counts),
            counts_b: Cow::Borrowed(&series_b.counts),
            interval_a,
            interval_b,
            scores,
            verdict,
            degenerate_baseline: degenerate,
            source_hint: Some(source_hint),
        }
    }

    /// Source location of a result
    ///
    /// Lookups without file names leave the file empty.
    pub fn source_hint(
        &self,
        lookup: &dyn SymbolLookup,
        name: &str,
        function_id: u64,
        lines: Option<LineRange>,
    ) -> SourceHint {
        let file = lookup.file_name(function_id).ok().map(|f| {
            f.strip_prefix(self.source_prefix.as_str())
                .map(str::to_string)
                .unwrap_or(f)
        });

        SourceHint {
            file,
            line: declared_line(name),
            lines,
        }
    }
}

/// Line number carried by a `name: line` function name
///
/// Splits on the last colon so qualified names keep their `::`.
pub fn declared_line(name: &str) -> Option<u32> {
    name.rsplit_once(':')
        .and_then(|(_, line)| line.trim().parse().ok())
}

/// Sort, split and de-duplicate results into a triage report
///
/// **Public** - final step of a comparison run
///
/// # Arguments
/// * `results` - Results of every matched testcase, in testcase order
/// * `config` - Configuration the results were produced with
/// * `testcases` - Number of matched testcases
pub fn build_report<'a>(
    results: Vec<ComparisonResult<'a>>,
    config: &CompareConfig,
    testcases: usize,
) -> TriageReport<'a> {
    let compared = results.len();
    let mut regressed = Vec::new();
    let mut acceptable = Vec::new();
    let mut degenerate = Vec::new();

    for result in results {
        if result.degenerate_baseline && config.method == CompareMethod::WeightedTime {
            degenerate.push(result);
        } else if result.verdict == Verdict::Regressed {
            regressed.push(result);
        } else {
            acceptable.push(result);
        }
    }

    regressed.sort_by(|x, y| compare_ratio_desc(x.scores.ratio, y.scores.ratio));

    let regressed = dedup_by_name(regressed);
    let acceptable = dedup_by_name(acceptable);
    let degenerate = dedup_by_name(degenerate);

    let summary = TriageSummary {
        compared,
        regressed: regressed.len(),
        acceptable: acceptable.len(),
        degenerate: degenerate.len(),
    };

    TriageReport {
        version: SCHEMA_VERSION.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        method: config.method,
        threshold: config.threshold,
        testcases,
        regressed,
        acceptable,
        degenerate,
        summary,
    }
}

/// Larger ratios first, undefined ratios last
fn compare_ratio_desc(x: Option<f64>, y: Option<f64>) -> Ordering {
    match (x, y) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Keep the first result of every name
pub fn dedup_by_name(results: Vec<ComparisonResult<'_>>) -> Vec<ComparisonResult<'_>> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.name.clone()))
        .collect()
}
