//! Pairing of equivalent testcases across trace sets.
//!
//! Two traces describe the same testcase when their command lines are
//! byte-for-byte equal.

use super::Testcase;
use crate::utils::error::MatchError;
use log::debug;
use std::collections::HashSet;

/// Result of pairing two trace sets
#[derive(Debug)]
pub struct Pairing<'a, T> {
    /// Matched testcases, in the order of the first set
    pub pairs: Vec<(&'a T, &'a T)>,

    /// First-set traces with no partner
    pub unmatched_a: Vec<&'a T>,

    /// Second-set traces with no partner
    pub unmatched_b: Vec<&'a T>,
}

/// Pair traces with equal command lines, greedily and one-to-one
///
/// **Public** - main entry point for two-way testcase matching
///
/// Each trace of `a` takes the first still-unconsumed trace of `b` with the
/// same command line. Traces left over on either side are returned, not
/// treated as errors.
pub fn find_pairs<'a, T: Testcase>(a: &'a [T], b: &'a [T]) -> Pairing<'a, T> {
    let mut consumed = vec![false; b.len()];
    let mut pairs = Vec::new();
    let mut unmatched_a = Vec::new();

    for left in a {
        let partner = b
            .iter()
            .enumerate()
            .find(|(j, right)| !consumed[*j] && right.command_line() == left.command_line());

        match partner {
            Some((j, right)) => {
                consumed[j] = true;
                pairs.push((left, right));
            }
            None => unmatched_a.push(left),
        }
    }

    let unmatched_b: Vec<&T> = b
        .iter()
        .zip(&consumed)
        .filter(|(_, &used)| !used)
        .map(|(right, _)| right)
        .collect();

    debug!(
        "Paired {} testcases ({} + {} unmatched)",
        pairs.len(),
        unmatched_a.len(),
        unmatched_b.len()
    );

    Pairing {
        pairs,
        unmatched_a,
        unmatched_b,
    }
}

/// Group traces whose command line occurs in every set
///
/// Groups follow the first set's order. Each group holds the first trace of
/// every set carrying that command line.
///
/// # Errors
/// * `MatchError::MatchingInvariantBroken` - a group does not end up with one
///   trace per set
pub fn find_pairs_n<'a, T: Testcase>(sets: &[&'a [T]]) -> Result<Vec<Vec<&'a T>>, MatchError> {
    let Some((first, rest)) = sets.split_first() else {
        return Ok(Vec::new());
    };

    let rest_commands: Vec<HashSet<&str>> = rest
        .iter()
        .map(|set| set.iter().map(Testcase::command_line).collect())
        .collect();

    let mut seen = HashSet::new();
    let common: Vec<&str> = first
        .iter()
        .map(Testcase::command_line)
        .filter(|cmd| rest_commands.iter().all(|set| set.contains(cmd)))
        .filter(|cmd| seen.insert(*cmd))
        .collect();

    let mut groups = Vec::with_capacity(common.len());
    for command_line in common {
        let group: Vec<&T> = sets
            .iter()
            .filter_map(|set| set.iter().find(|t| t.command_line() == command_line))
            .collect();

        if group.len() != sets.len() {
            return Err(MatchError::MatchingInvariantBroken {
                command_line: command_line.to_string(),
                expected: sets.len(),
                found: group.len(),
            });
        }
        groups.push(group);
    }

    debug!("{} command lines common to {} trace sets", groups.len(), sets.len());
    Ok(groups)
}
