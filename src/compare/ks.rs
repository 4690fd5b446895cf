//! Two-sample Kolmogorov-Smirnov test over histogram shapes.
//!
//! Each histogram stands for its bucket starts, each repeated `count` times,
//! min-max normalised to `[0, 1]`. The test walks the weighted buckets
//! directly, so its cost follows the bucket count and not the counts.

use crate::parser::Histogram;
use serde::{Deserialize, Serialize};

const MAX_TERMS: i32 = 100;
const EPS_TERM: f64 = 0.001;
const EPS_SUM: f64 = 1.0e-8;

/// Outcome of one test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsOutcome {
    /// Largest distance between the two empirical CDFs
    pub statistic: f64,
    pub p_value: f64,
}

impl KsOutcome {
    /// Shape divergence verdict
    ///
    /// Compares the p-value against the statistic itself rather than a
    /// significance level. Historical tooling decided this way and results
    /// are kept comparable with it.
    pub fn is_divergent(&self) -> bool {
        self.p_value < self.statistic
    }
}

/// Normalised position of every populated bucket with its count
///
/// Ascending by position. All-equal positions normalise to zero.
pub fn normalized_points(histogram: &Histogram) -> Vec<(f64, u64)> {
    let populated: Vec<(u64, u64)> = histogram
        .iter()
        .filter(|(_, &count)| count > 0)
        .map(|(&start, &count)| (start, count.unsigned_abs()))
        .collect();

    let (Some(&(min, _)), Some(&(max, _))) = (populated.first(), populated.last()) else {
        return Vec::new();
    };
    let range = (max - min) as f64;

    populated
        .into_iter()
        .map(|(start, count)| {
            let position = if range > 0.0 {
                (start - min) as f64 / range
            } else {
                0.0
            };
            (position, count)
        })
        .collect()
}

/// Largest CDF distance of two weighted samples
///
/// **Private** - points must be sorted ascending by position
fn statistic(a: &[(f64, u64)], b: &[(f64, u64)], n1: f64, n2: f64) -> f64 {
    let (mut i, mut j) = (0usize, 0usize);
    let (mut seen_a, mut seen_b) = (0u64, 0u64);
    let mut d: f64 = 0.0;

    while i < a.len() && j < b.len() {
        let x = a[i].0.min(b[j].0);
        while i < a.len() && a[i].0 <= x {
            seen_a += a[i].1;
            i += 1;
        }
        while j < b.len() && b[j].0 <= x {
            seen_b += b[j].1;
            j += 1;
        }
        d = d.max((seen_a as f64 / n1 - seen_b as f64 / n2).abs());
    }
    d
}

/// Kolmogorov distribution survival function `Q(lambda)`
///
/// Returns 1 when the alternating series does not converge.
fn kolmogorov_q(lambda: f64) -> f64 {
    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0;

    for j in 1..=MAX_TERMS {
        let jf = f64::from(j);
        let term = fac * (a2 * jf * jf).exp();
        sum += term;
        if term.abs() <= EPS_TERM * previous || term.abs() <= EPS_SUM * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        previous = term.abs();
    }
    1.0
}

/// Run the test on two weighted samples
///
/// The p-value uses the asymptotic distribution with Stephens' small-sample
/// correction, with the total weights as sample sizes. Empty input yields a
/// statistic of 0 and a p-value of 1.
pub fn weighted_two_sample(a: &[(f64, u64)], b: &[(f64, u64)]) -> KsOutcome {
    let n1 = a.iter().map(|&(_, w)| w as f64).sum::<f64>();
    let n2 = b.iter().map(|&(_, w)| w as f64).sum::<f64>();
    if n1 == 0.0 || n2 == 0.0 {
        return KsOutcome {
            statistic: 0.0,
            p_value: 1.0,
        };
    }

    let d = statistic(a, b, n1, n2);
    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let p_value = kolmogorov_q((en + 0.12 + 0.11 / en) * d);

    KsOutcome {
        statistic: d,
        p_value,
    }
}

/// Run the test on two plain sample sets
pub fn two_sample(a: &[f64], b: &[f64]) -> KsOutcome {
    let unit = |values: &[f64]| {
        let mut points: Vec<(f64, u64)> = values.iter().map(|&v| (v, 1)).collect();
        points.sort_by(|x, y| x.0.total_cmp(&y.0));
        points
    };
    weighted_two_sample(&unit(a), &unit(b))
}

/// Compare the shapes of two histograms
pub fn compare_histograms(a: &Histogram, b: &Histogram) -> KsOutcome {
    weighted_two_sample(&normalized_points(a), &normalized_points(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_points() {
        let h: Histogram = [(0, 1), (5000, 2), (10000, 1)].into_iter().collect();
        assert_eq!(normalized_points(&h), vec![(0.0, 1), (0.5, 2), (1.0, 1)]);
    }

    #[test]
    fn test_single_bucket_normalizes_to_zero() {
        let h: Histogram = [(5000, 3)].into_iter().collect();
        assert_eq!(normalized_points(&h), vec![(0.0, 3)]);
    }

    #[test]
    fn test_histogram_matches_expanded_samples() {
        let a: Histogram = [(0, 3), (100, 1), (300, 2)].into_iter().collect();
        let b: Histogram = [(100, 2), (200, 5)].into_iter().collect();
        let expanded_a = vec![0.0, 0.0, 0.0, 1.0 / 3.0, 1.0, 1.0];
        let expanded_b = vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];

        assert_eq!(compare_histograms(&a, &b), two_sample(&expanded_a, &expanded_b));
    }

    #[test]
    fn test_large_counts_use_bucket_weights() {
        let a: Histogram = [(100, 40_000_000), (200, 40_000_000)].into_iter().collect();
        let b: Histogram = [(100, 40_000_000), (200, 80_000_000)].into_iter().collect();

        let outcome = compare_histograms(&a, &b);
        assert!((outcome.statistic - 1.0 / 6.0).abs() < 1e-12);
        assert!(outcome.p_value < 1e-6);
        assert!(outcome.is_divergent());
    }

    #[test]
    fn test_identical_samples() {
        let a = vec![0.0, 0.25, 0.5, 1.0];
        let outcome = two_sample(&a, &a);
        assert_eq!(outcome.statistic, 0.0);
        assert_eq!(outcome.p_value, 1.0);
        assert!(!outcome.is_divergent());
    }

    #[test]
    fn test_disjoint_samples_diverge() {
        let a: Vec<f64> = (0..50).map(|i| i as f64 / 100.0).collect();
        let b: Vec<f64> = (0..50).map(|i| 0.6 + i as f64 / 200.0).collect();
        let outcome = two_sample(&a, &b);
        assert_eq!(outcome.statistic, 1.0);
        assert!(outcome.p_value < 1e-6);
        assert!(outcome.is_divergent());
    }

    #[test]
    fn test_empty_sample() {
        let outcome = two_sample(&[], &[0.5]);
        assert_eq!(outcome, KsOutcome { statistic: 0.0, p_value: 1.0 });
    }

    #[test]
    fn test_half_shift_statistic() {
        let a = vec![0.0, 0.0, 1.0, 1.0];
        let b = vec![1.0, 1.0, 1.0, 1.0];
        assert_eq!(two_sample(&a, &b).statistic, 0.5);
    }
}
