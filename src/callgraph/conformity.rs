//! Caller/callee conformity between two architectures.
//!
//! Counts how often each named caller -> callee edge appears in the sampled
//! chains of a testcase, then ranks the edges whose frequency differs most
//! between the two sides.

use super::perf_db::SampledTrace;
use crate::lookup::SymbolTable;
use crate::utils::error::CallGraphError;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

/// Named call edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
}

/// Edge -> number of samples in which it appears
pub type EdgeCounts = HashMap<CallEdge, u64>;

/// Frequency difference of one edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeDelta {
    pub edge: CallEdge,
    pub delta: u64,
}

/// Count caller -> callee edges over innermost-first chains
///
/// # Errors
/// * `CallGraphError::MissingSymbol` - a chain names a symbol absent from `symbols`
pub fn edge_frequencies(
    chains: &[Vec<u64>],
    symbols: &SymbolTable,
) -> Result<EdgeCounts, CallGraphError> {
    let name = |id: u64| {
        symbols
            .get(id)
            .map(str::to_string)
            .ok_or(CallGraphError::MissingSymbol { symbol_id: id })
    };

    let mut counts = EdgeCounts::new();
    for chain in chains {
        for frames in chain.windows(2) {
            let edge = CallEdge {
                caller: name(frames[1])?,
                callee: name(frames[0])?,
            };
            *counts.entry(edge).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Per-edge frequency difference of side 1 against side 2, largest first
///
/// Edges seen only on side 2 are not reported.
pub fn edge_deltas(side1: &EdgeCounts, side2: &EdgeCounts) -> Vec<EdgeDelta> {
    let mut deltas: Vec<EdgeDelta> = side1
        .iter()
        .map(|(edge, &f1)| EdgeDelta {
            edge: edge.clone(),
            delta: match side2.get(edge) {
                Some(&f2) => f1.abs_diff(f2),
                None => f1,
            },
        })
        .collect();

    sort_deltas(&mut deltas);
    deltas
}

fn sort_deltas(deltas: &mut [EdgeDelta]) {
    deltas.sort_by(|a, b| b.delta.cmp(&a.delta).then_with(|| a.edge.cmp(&b.edge)));
}

/// Rank edges across many matched testcases
///
/// **Public** - main entry point for conformity analysis
///
/// # Arguments
/// * `pairs` - Matched sampled traces (side 1, side 2)
/// * `per_testcase` - Edges kept from each testcase before summing
/// * `top_n` - Edges reported overall
pub fn rank_divergent_edges(
    pairs: &[(&SampledTrace, &SampledTrace)],
    per_testcase: usize,
    top_n: usize,
) -> Result<Vec<EdgeDelta>, CallGraphError> {
    let mut totals: HashMap<CallEdge, u64> = HashMap::new();

    for (a, b) in pairs {
        let f1 = edge_frequencies(&a.chains, &a.symbols)?;
        let f2 = edge_frequencies(&b.chains, &b.symbols)?;
        let deltas = edge_deltas(&f1, &f2);
        debug!(
            "{}: {} edges, {} kept",
            a.record.display_name(),
            deltas.len(),
            deltas.len().min(per_testcase)
        );

        for delta in deltas.into_iter().take(per_testcase) {
            *totals.entry(delta.edge).or_insert(0) += delta.delta;
        }
    }

    let mut ranked: Vec<EdgeDelta> = totals
        .into_iter()
        .map(|(edge, delta)| EdgeDelta { edge, delta })
        .collect();
    sort_deltas(&mut ranked);
    ranked.truncate(top_n);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        vec![
            (1, "main".to_string()),
            (2, "parse".to_string()),
            (3, "lex".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn edge(caller: &str, callee: &str) -> CallEdge {
        CallEdge {
            caller: caller.to_string(),
            callee: callee.to_string(),
        }
    }

    #[test]
    fn test_edge_frequencies() {
        let chains = vec![vec![3, 2, 1], vec![2, 1], vec![1]];
        let counts = edge_frequencies(&chains, &table()).unwrap();
        assert_eq!(counts[&edge("main", "parse")], 2);
        assert_eq!(counts[&edge("parse", "lex")], 1);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_edge_deltas_one_sided() {
        let mut side1 = EdgeCounts::new();
        side1.insert(edge("main", "parse"), 10);
        side1.insert(edge("parse", "lex"), 4);
        let mut side2 = EdgeCounts::new();
        side2.insert(edge("main", "parse"), 3);
        side2.insert(edge("main", "exit"), 50);

        let deltas = edge_deltas(&side1, &side2);
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0], EdgeDelta { edge: edge("main", "parse"), delta: 7 });
        assert_eq!(deltas[1], EdgeDelta { edge: edge("parse", "lex"), delta: 4 });
    }

    #[test]
    fn test_unknown_symbol_in_chain() {
        assert!(edge_frequencies(&[vec![9, 1]], &table()).is_err());
    }
}
