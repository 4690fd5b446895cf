//! Per-symbol active-time histograms from consecutive call chains.
//!
//! A symbol enters when it appears in a chain it was absent from in the
//! previous sample, and leaves when it disappears. Each completed activation
//! adds one count at its duration, aligned down to the bucket width.

use super::callpath::ResolvedSample;
use crate::parser::Histogram;
use crate::utils::error::CallGraphError;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Align a duration down to a multiple of `interval`
pub fn align_down(duration: u64, interval: u32) -> u64 {
    let interval = u64::from(interval.max(1));
    duration / interval * interval
}

/// Accumulate activation durations in a single forward pass
///
/// **Public** - main entry point for activity reconstruction
///
/// # Arguments
/// * `samples` - One testcase's samples, ordered by timestamp
/// * `interval` - Bucket width in nanoseconds
///
/// # Returns
/// Symbol id -> histogram of activation durations
///
/// # Errors
/// * `CallGraphError::OutOfOrderSample` - a timestamp goes backwards
/// * `CallGraphError::UnbalancedActivation` - a symbol leaves without an
///   enter time
pub fn accumulate_activity(
    samples: &[ResolvedSample],
    interval: u32,
) -> Result<BTreeMap<u64, Histogram>, CallGraphError> {
    let mut histograms: BTreeMap<u64, Histogram> = BTreeMap::new();
    let mut last_enter: HashMap<u64, u64> = HashMap::new();
    let mut previous: Option<(u64, HashSet<u64>)> = None;

    for sample in samples {
        let current: HashSet<u64> = sample.chain.iter().copied().collect();

        match previous.take() {
            None => {
                for &symbol in &current {
                    last_enter.insert(symbol, sample.timestamp);
                }
            }
            Some((previous_ts, previous_set)) => {
                if sample.timestamp < previous_ts {
                    return Err(CallGraphError::OutOfOrderSample {
                        sample_id: sample.sample_id,
                        timestamp: sample.timestamp,
                        previous: previous_ts,
                    });
                }

                for &symbol in current.difference(&previous_set) {
                    last_enter.insert(symbol, sample.timestamp);
                }

                for &symbol in previous_set.difference(&current) {
                    let entered = last_enter.get(&symbol).copied().ok_or(
                        CallGraphError::UnbalancedActivation {
                            symbol_id: symbol,
                            timestamp: sample.timestamp,
                        },
                    )?;
                    let boundary = align_down(sample.timestamp - entered, interval);
                    *histograms
                        .entry(symbol)
                        .or_default()
                        .entry(boundary)
                        .or_insert(0) += 1;
                }
            }
        }

        previous = Some((sample.timestamp, current));
    }

    debug!(
        "Accumulated activity for {} symbols from {} samples",
        histograms.len(),
        samples.len()
    );
    Ok(histograms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(sample_id: u64, timestamp: u64, chain: &[u64]) -> ResolvedSample {
        ResolvedSample {
            sample_id,
            timestamp,
            chain: chain.to_vec(),
        }
    }

    #[test]
    fn test_symbol_leaving_after_two_samples() {
        let samples = vec![
            resolved(1, 0, &[7, 1]),
            resolved(2, 1000, &[7, 1]),
            resolved(3, 6000, &[1]),
        ];
        let histograms = accumulate_activity(&samples, 5000).unwrap();
        let expected: Histogram = [(5000, 1)].into_iter().collect();
        assert_eq!(histograms.get(&7), Some(&expected));
        assert!(!histograms.contains_key(&1));
    }

    #[test]
    fn test_reentry_counts_each_activation() {
        let samples = vec![
            resolved(1, 0, &[1]),
            resolved(2, 100, &[2, 1]),
            resolved(3, 250, &[1]),
            resolved(4, 300, &[2, 1]),
            resolved(5, 420, &[1]),
        ];
        let histograms = accumulate_activity(&samples, 100).unwrap();
        let expected: Histogram = [(100, 2)].into_iter().collect();
        assert_eq!(histograms[&2], expected);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let samples = vec![resolved(1, 500, &[1]), resolved(2, 100, &[2])];
        assert!(matches!(
            accumulate_activity(&samples, 100),
            Err(CallGraphError::OutOfOrderSample { sample_id: 2, .. })
        ));
    }

    #[test]
    fn test_empty_stream() {
        assert!(accumulate_activity(&[], 5000).unwrap().is_empty());
    }

    #[test]
    fn test_align_down() {
        assert_eq!(align_down(6000, 5000), 5000);
        assert_eq!(align_down(4999, 5000), 0);
        assert_eq!(align_down(7, 0), 7);
    }
}
