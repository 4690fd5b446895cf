//! Symbol and source-line lookup.
//!
//! Trace files only carry packed ids. Names, file names and basic-block line
//! ranges live in per-module debug-info stores written at instrumentation
//! time; sampled traces carry their own symbol table instead.

pub mod sqlite;

pub use sqlite::DebugInfoStore;

use crate::parser::{BlockKey, CollectionMode, FunctionKey, TraceRecord};
use crate::utils::error::LookupError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inclusive source line range of a basic block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

/// Read-only name resolution for one side of a comparison
pub trait SymbolLookup {
    /// Name of the function identified by a composite function id
    fn function_name(&self, function_id: u64) -> Result<String, LookupError>;

    /// Source file of the function identified by a composite function id
    fn file_name(&self, function_id: u64) -> Result<String, LookupError>;

    /// Composite function id of the function owning a block
    fn block_function_id(&self, block_id: u64) -> Result<u64, LookupError>;

    /// Source lines covered by a block
    fn block_lines(&self, block_id: u64) -> Result<LineRange, LookupError>;
}

/// Resolve the display name of a trace symbol according to the trace's mode
///
/// Block traces name a block after its owning function.
pub fn symbol_name(
    record: &TraceRecord,
    symbol_id: u64,
    lookup: &dyn SymbolLookup,
) -> Result<String, LookupError> {
    match record.mode {
        CollectionMode::BasicBlockTime => {
            let function_id = lookup.block_function_id(symbol_id)?;
            lookup.function_name(function_id)
        }
        _ => lookup.function_name(symbol_id),
    }
}

/// Module ids a trace refers to, for stores keyed by module
pub fn referenced_modules(record: &TraceRecord) -> Vec<u16> {
    let mut modules: Vec<u16> = record
        .symbols
        .keys()
        .map(|&id| {
            if record.mode.is_block_mode() {
                BlockKey::decode(id).module_id
            } else {
                FunctionKey::decode(id).module_id
            }
        })
        .collect();
    modules.sort_unstable();
    modules.dedup();
    modules
}

/// Symbol id -> name table, as exported alongside sampled stacks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    names: HashMap<u64, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u64, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn get(&self, id: u64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.names.iter().map(|(&id, name)| (id, name.as_str()))
    }
}

impl FromIterator<(u64, String)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

impl SymbolLookup for SymbolTable {
    fn function_name(&self, function_id: u64) -> Result<String, LookupError> {
        self.get(function_id)
            .map(str::to_string)
            .ok_or(LookupError::MissingEntry {
                table: "symbols",
                module_id: 0,
                id: function_id,
            })
    }

    fn file_name(&self, _function_id: u64) -> Result<String, LookupError> {
        Err(LookupError::Unsupported("sampled symbol tables carry no file names"))
    }

    fn block_function_id(&self, _block_id: u64) -> Result<u64, LookupError> {
        Err(LookupError::Unsupported("sampled symbol tables carry no blocks"))
    }

    fn block_lines(&self, _block_id: u64) -> Result<LineRange, LookupError> {
        Err(LookupError::Unsupported("sampled symbol tables carry no blocks"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::encode_function_id;

    #[test]
    fn test_symbol_table_lookup() {
        let table: SymbolTable = vec![(1, "main".to_string()), (2, "unknown".to_string())]
            .into_iter()
            .collect();
        assert_eq!(table.function_name(1).unwrap(), "main");
        assert!(matches!(
            table.function_name(3),
            Err(LookupError::MissingEntry { id: 3, .. })
        ));
        assert!(table.file_name(1).is_err());
    }

    #[test]
    fn test_referenced_modules_dedup() {
        let mut record = TraceRecord::new("t", CollectionMode::WallTime, None, 1, 1);
        record.insert_counts(encode_function_id(3, 1, 1), vec![1]);
        record.insert_counts(encode_function_id(3, 2, 1), vec![1]);
        record.insert_counts(encode_function_id(1, 2, 1), vec![1]);
        assert_eq!(referenced_modules(&record), vec![1, 3]);
    }
}
