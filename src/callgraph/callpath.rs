//! Sampled call stacks.
//!
//! Samples point at the leaf node of a call-path tree shared by every sample
//! of the same process. Nodes refer to their parent by id; id 0 is the root.

use crate::lookup::SymbolTable;
use crate::utils::config::UNKNOWN_SYMBOL;
use crate::utils::error::CallGraphError;
use std::collections::HashMap;

/// One stack-sampling event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSample {
    pub sample_id: u64,
    pub command_id: u64,
    pub module_id: u64,
    pub symbol_id: u64,
    pub ip: u64,
    /// Nanoseconds
    pub timestamp: u64,
    /// Leaf node of the sample's call path
    pub call_path_id: u64,
}

/// One node of the call-path tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPath {
    pub id: u64,
    /// 0 terminates traversal
    pub parent_id: u64,
    pub symbol_id: u64,
}

/// Call-path nodes indexed by id
#[derive(Debug, Clone, Default)]
pub struct CallPathArena {
    nodes: HashMap<u64, CallPath>,
}

impl CallPathArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: CallPath) {
        self.nodes.insert(node.id, node);
    }

    pub fn get(&self, id: u64) -> Option<&CallPath> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<CallPath> for CallPathArena {
    fn from_iter<I: IntoIterator<Item = CallPath>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().map(|node| (node.id, node)).collect(),
        }
    }
}

/// A sample together with its resolved call chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSample {
    pub sample_id: u64,
    pub timestamp: u64,
    /// Symbol ids, innermost frame first
    pub chain: Vec<u64>,
}

/// Resolve the symbol chain of one sample, innermost frame first
///
/// **Public** - main entry point for stack resolution
///
/// The chain starts with the sample's own symbol and walks parent links up
/// to the root, skipping frames whose symbol is named `unknown`. The leaf
/// node repeats the sample's own frame and is not appended twice.
///
/// # Errors
/// * `CallGraphError::MissingSymbol` - the sample or a frame names a symbol
///   absent from `symbols`
/// * `CallGraphError::BrokenCallPath` - a referenced node is absent, or the
///   parent links loop
pub fn resolve_chain(
    sample: &CallSample,
    symbols: &SymbolTable,
    arena: &CallPathArena,
) -> Result<Vec<u64>, CallGraphError> {
    if symbols.get(sample.symbol_id).is_none() {
        return Err(CallGraphError::MissingSymbol {
            symbol_id: sample.symbol_id,
        });
    }

    let broken = |call_path_id| CallGraphError::BrokenCallPath {
        sample_id: sample.sample_id,
        call_path_id,
    };

    let mut chain = vec![sample.symbol_id];
    let mut node = arena
        .get(sample.call_path_id)
        .ok_or_else(|| broken(sample.call_path_id))?;
    let mut is_leaf = true;
    let mut steps = 0usize;

    while node.parent_id != 0 {
        steps += 1;
        if steps > arena.len() {
            return Err(broken(node.id));
        }

        let name = symbols
            .get(node.symbol_id)
            .ok_or(CallGraphError::MissingSymbol {
                symbol_id: node.symbol_id,
            })?;

        let repeats_leaf = is_leaf && node.symbol_id == sample.symbol_id;
        if name != UNKNOWN_SYMBOL && !repeats_leaf {
            chain.push(node.symbol_id);
        }
        is_leaf = false;

        node = arena.get(node.parent_id).ok_or_else(|| broken(node.parent_id))?;
    }

    Ok(chain)
}

/// Resolve every sample, keeping stream order
pub fn resolve_samples(
    samples: &[CallSample],
    symbols: &SymbolTable,
    arena: &CallPathArena,
) -> Result<Vec<ResolvedSample>, CallGraphError> {
    samples
        .iter()
        .map(|sample| {
            Ok(ResolvedSample {
                sample_id: sample.sample_id,
                timestamp: sample.timestamp,
                chain: resolve_chain(sample, symbols, arena)?,
            })
        })
        .collect()
}
