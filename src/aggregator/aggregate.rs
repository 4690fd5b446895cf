//! Multi-run score aggregation.
//!
//! Every function common to the N runs of one testcase is scored once per
//! run with each run scorer. Per-function sums and means are then rolled
//! up into testcase totals and, across testcases, into grand totals.

use crate::compare::RunScorer;
use crate::matcher::{match_functions_n, FunctionGroup, TraceSide};
use crate::utils::error::MatchError;
use log::debug;
use serde::Serialize;

/// Scores of one run scorer over the runs of a function
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorerSummary {
    pub scorer: RunScorer,

    /// One score per run, in run order
    pub per_run: Vec<f64>,

    pub sum: f64,

    pub mean: f64,
}

impl ScorerSummary {
    fn from_runs(scorer: RunScorer, per_run: Vec<f64>) -> Self {
        let sum: f64 = per_run.iter().sum();
        let mean = if per_run.is_empty() {
            0.0
        } else {
            sum / per_run.len() as f64
        };
        Self {
            scorer,
            per_run,
            sum,
            mean,
        }
    }
}

/// One function aggregated over every run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionAggregate {
    pub name: String,

    /// One entry per run scorer, in `RunScorer::ALL` order
    pub scores: Vec<ScorerSummary>,

    /// Element-wise sum of the raw counts of every run
    pub summed_counts: Vec<i64>,
}

impl FunctionAggregate {
    pub fn summary(&self, scorer: RunScorer) -> Option<&ScorerSummary> {
        self.scores.iter().find(|s| s.scorer == scorer)
    }

    /// Mean of one scorer, 0 if it was not computed
    pub fn mean(&self, scorer: RunScorer) -> f64 {
        self.summary(scorer).map(|s| s.mean).unwrap_or(0.0)
    }
}

/// Roll-up of one scorer over many functions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScorerTotal {
    pub scorer: RunScorer,

    /// Sum of per-function means
    pub sum_of_means: f64,

    /// Sum of per-function sums
    pub sum_of_sums: f64,
}

/// Totals of every run scorer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTotals {
    pub scorers: Vec<ScorerTotal>,
}

impl Default for AggregateTotals {
    fn default() -> Self {
        Self {
            scorers: RunScorer::ALL
                .iter()
                .map(|&scorer| ScorerTotal {
                    scorer,
                    sum_of_means: 0.0,
                    sum_of_sums: 0.0,
                })
                .collect(),
        }
    }
}

impl AggregateTotals {
    pub fn get(&self, scorer: RunScorer) -> Option<&ScorerTotal> {
        self.scorers.iter().find(|t| t.scorer == scorer)
    }

    /// Sum of means of one scorer, 0 if absent
    pub fn sum_of_means(&self, scorer: RunScorer) -> f64 {
        self.get(scorer).map(|t| t.sum_of_means).unwrap_or(0.0)
    }

    fn add_function(&mut self, function: &FunctionAggregate) {
        for total in &mut self.scorers {
            if let Some(summary) = function.summary(total.scorer) {
                total.sum_of_means += summary.mean;
                total.sum_of_sums += summary.sum;
            }
        }
    }

    fn add_totals(&mut self, other: &AggregateTotals) {
        for total in &mut self.scorers {
            if let Some(o) = other.get(total.scorer) {
                total.sum_of_means += o.sum_of_means;
                total.sum_of_sums += o.sum_of_sums;
            }
        }
    }
}

/// Aggregation of the N runs of one testcase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestcaseAggregate {
    pub command_line: String,

    pub runs: usize,

    /// Functions in the name order of the first run
    pub functions: Vec<FunctionAggregate>,

    pub totals: AggregateTotals,
}

/// Element-wise sum, shorter vectors padded with zeros
///
/// **Private** - helper for summed counts; saturates at the `i64` bounds
fn add_counts(acc: &mut Vec<i64>, counts: &[i64]) {
    if acc.len() < counts.len() {
        acc.resize(counts.len(), 0);
    }
    for (slot, &c) in acc.iter_mut().zip(counts) {
        *slot = slot.saturating_add(c);
    }
}

/// Aggregate already matched function groups
///
/// **Public** - core of the multi-run pipeline
///
/// # Arguments
/// * `command_line` - Testcase the groups belong to
/// * `groups` - One group per common function
/// * `runs` - Number of runs every group must cover
///
/// # Errors
/// * `MatchError::IncompleteMatchGroup` - a group has the wrong size
pub fn aggregate_groups(
    command_line: &str,
    groups: &[FunctionGroup<'_>],
    runs: usize,
) -> Result<TestcaseAggregate, MatchError> {
    let mut functions = Vec::with_capacity(groups.len());
    let mut totals = AggregateTotals::default();

    for group in groups {
        if group.members.len() != runs {
            return Err(MatchError::IncompleteMatchGroup {
                symbol: group.name.clone(),
                expected: runs,
                found: group.members.len(),
            });
        }

        let scores: Vec<ScorerSummary> = RunScorer::ALL
            .iter()
            .map(|&scorer| {
                let per_run = group
                    .members
                    .iter()
                    .map(|(_, series)| scorer.score(&series.counts))
                    .collect();
                ScorerSummary::from_runs(scorer, per_run)
            })
            .collect();

        let mut summed_counts = Vec::new();
        for (_, series) in &group.members {
            add_counts(&mut summed_counts, &series.counts);
        }

        let function = FunctionAggregate {
            name: group.name.clone(),
            scores,
            summed_counts,
        };
        totals.add_function(&function);
        functions.push(function);
    }

    debug!(
        "{}: aggregated {} functions over {} runs",
        command_line,
        functions.len(),
        runs
    );

    Ok(TestcaseAggregate {
        command_line: command_line.to_string(),
        runs,
        functions,
        totals,
    })
}

/// Match and aggregate the runs of one testcase
///
/// # Errors
/// * `MatchError::Lookup` - a name could not be resolved
pub fn aggregate_testcase(
    sides: &[TraceSide<'_>],
    min_populated: usize,
) -> Result<TestcaseAggregate, MatchError> {
    let command_line = sides
        .first()
        .map(|s| s.record.cmdline.clone())
        .unwrap_or_default();
    let groups = match_functions_n(sides, min_populated)?;
    aggregate_groups(&command_line, &groups, sides.len())
}

/// Totals across every aggregated testcase
pub fn grand_totals(testcases: &[TestcaseAggregate]) -> AggregateTotals {
    let mut totals = AggregateTotals::default();
    for testcase in testcases {
        totals.add_totals(&testcase.totals);
    }
    totals
}
