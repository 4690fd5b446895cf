//! Scoring functions over raw per-bucket count vectors.
//!
//! All scorers are pure. Vectors of unequal length are scored as if the
//! shorter one were padded with zeros.

use crate::utils::error::ScoreError;
use serde::{Deserialize, Serialize};

/// Raw counts of one side together with its bucket width
#[derive(Debug, Clone, Copy)]
pub struct CountVector<'a> {
    pub counts: &'a [i64],
    pub interval: u32,
}

impl<'a> CountVector<'a> {
    pub fn new(counts: &'a [i64], interval: u32) -> Self {
        Self { counts, interval }
    }
}

/// Scorers comparing two sides of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairScorer {
    /// `t2 / t1 - 1` of the weighted time integrals
    WeightedTimeRatio,
    /// Directional CDF-weighted difference
    Cdf,
    /// Relative entropy of the raw counts
    KlDivergence,
    /// Weighted time of side 2 minus side 1
    DiffTime,
}

impl PairScorer {
    pub const ALL: [PairScorer; 4] = [
        PairScorer::WeightedTimeRatio,
        PairScorer::Cdf,
        PairScorer::KlDivergence,
        PairScorer::DiffTime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PairScorer::WeightedTimeRatio => "ratio",
            PairScorer::Cdf => "cdf",
            PairScorer::KlDivergence => "kl_div",
            PairScorer::DiffTime => "diff_time",
        }
    }

    /// Score two sides
    ///
    /// # Errors
    /// * `ScoreError::DegenerateBaseline` - ratio with a zero baseline
    pub fn score(self, a: CountVector<'_>, b: CountVector<'_>) -> Result<f64, ScoreError> {
        match self {
            PairScorer::WeightedTimeRatio => time_ratio(a, b),
            PairScorer::Cdf => Ok(cdf(a.counts, b.counts)),
            PairScorer::KlDivergence => Ok(kl_divergence(a.counts, b.counts)),
            PairScorer::DiffTime => Ok(diff_time(a, b)),
        }
    }
}

/// Scorers applied to each run of a multi-run aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunScorer {
    /// `sum d[j] * (B-1-j)`
    SumTime,
    /// `sum d[j] / (j+1)`
    YOverX,
    /// `1 / sum (j+1) / d[j]` over non-zero buckets
    InverseXOverY,
}

impl RunScorer {
    pub const ALL: [RunScorer; 3] = [RunScorer::SumTime, RunScorer::YOverX, RunScorer::InverseXOverY];

    /// Column label in exported score files
    pub fn name(self) -> &'static str {
        match self {
            RunScorer::SumTime => "total",
            RunScorer::YOverX => "y/x",
            RunScorer::InverseXOverY => "1/(x/y)",
        }
    }

    pub fn score(self, counts: &[i64]) -> f64 {
        match self {
            RunScorer::SumTime => sum_time(counts),
            RunScorer::YOverX => y_over_x(counts),
            RunScorer::InverseXOverY => inverse_x_over_y(counts),
        }
    }
}

/// Weighted time integral `sum (j * interval) * d[j]`
pub fn weighted_time(v: CountVector<'_>) -> f64 {
    let interval = i128::from(v.interval);
    v.counts
        .iter()
        .enumerate()
        .map(|(j, &c)| j as i128 * interval * i128::from(c))
        .sum::<i128>() as f64
}

/// Relative increase of side `b` over side `a`
///
/// # Errors
/// * `ScoreError::DegenerateBaseline` - side `a` integrates to zero
pub fn time_ratio(a: CountVector<'_>, b: CountVector<'_>) -> Result<f64, ScoreError> {
    let t1 = weighted_time(a);
    if t1 == 0.0 {
        return Err(ScoreError::DegenerateBaseline { baseline_time: t1 });
    }
    Ok(weighted_time(b) / t1 - 1.0)
}

/// Weighted time of `b` minus weighted time of `a`
pub fn diff_time(a: CountVector<'_>, b: CountVector<'_>) -> f64 {
    weighted_time(b) - weighted_time(a)
}

fn padded(counts: &[i64], j: usize) -> i64 {
    counts.get(j).copied().unwrap_or(0)
}

/// `sum (d1[j] - d2[j]) * (B-1-j)`; positive when side 1 is faster
pub fn cdf(d1: &[i64], d2: &[i64]) -> f64 {
    let len = d1.len().max(d2.len());
    (0..len)
        .map(|j| {
            let weight = (len - 1 - j) as i128;
            i128::from(padded(d1, j) - padded(d2, j)) * weight
        })
        .sum::<i128>() as f64
}

/// Elementwise relative entropy, summed
///
/// `x ln(x/y)` when both are positive, 0 when `x` is 0 and `y` is not
/// negative, infinity otherwise.
pub fn rel_entr(x: f64, y: f64) -> f64 {
    if x > 0.0 && y > 0.0 {
        x * (x / y).ln()
    } else if x == 0.0 && y >= 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}

/// KL divergence of the raw count vectors, without normalisation
pub fn kl_divergence(d1: &[i64], d2: &[i64]) -> f64 {
    let len = d1.len().max(d2.len());
    (0..len)
        .map(|j| rel_entr(padded(d1, j) as f64, padded(d2, j) as f64))
        .sum()
}

/// `sum d[j] * (B-1-j)`
pub fn sum_time(counts: &[i64]) -> f64 {
    let len = counts.len();
    counts
        .iter()
        .enumerate()
        .map(|(j, &c)| i128::from(c) * (len - 1 - j) as i128)
        .sum::<i128>() as f64
}

/// `sum d[j] / (j+1)`
pub fn y_over_x(counts: &[i64]) -> f64 {
    counts
        .iter()
        .enumerate()
        .map(|(j, &c)| c as f64 / (j + 1) as f64)
        .sum()
}

/// `1 / sum (j+1) / d[j]` over non-zero buckets, 0 if nothing contributes
pub fn inverse_x_over_y(counts: &[i64]) -> f64 {
    let s: f64 = counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c != 0)
        .map(|(j, &c)| (j + 1) as f64 / c as f64)
        .sum();

    if s == 0.0 {
        0.0
    } else {
        1.0 / s
    }
}
