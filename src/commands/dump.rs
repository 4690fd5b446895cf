//! Dump command implementation.
//!
//! Prints the header of one trace file and the total count of each symbol,
//! named through the debug-info stores when they are given.

use super::models::DumpArgs;
use crate::lookup::{symbol_name, DebugInfoStore, SymbolLookup};
use crate::parser::{read_trace, TraceRecord};
use anyhow::{Context, Result};
use log::debug;

/// One printed symbol line
#[derive(Debug, Clone, PartialEq)]
pub struct DumpEntry {
    pub id: u64,
    /// Owning function id, block traces only
    pub function_id: Option<u64>,
    pub total: i64,
    pub name: Option<String>,
}

/// Collect the per-symbol totals of a trace
///
/// Entries are in id order, or by descending total when `top` is set.
/// Names that cannot be resolved are left empty.
pub fn dump_entries(
    record: &TraceRecord,
    lookup: Option<&dyn SymbolLookup>,
    top: Option<usize>,
) -> Vec<DumpEntry> {
    let mut entries: Vec<DumpEntry> = record
        .symbols
        .iter()
        .map(|(&id, series)| {
            let function_id = if record.mode.is_block_mode() {
                lookup.and_then(|l| l.block_function_id(id).ok())
            } else {
                None
            };
            let name = lookup.and_then(|l| match symbol_name(record, id, l) {
                Ok(name) => Some(name),
                Err(e) => {
                    debug!("{:#x}: {}", id, e);
                    None
                }
            });
            DumpEntry {
                id,
                function_id,
                total: series.total_count(),
                name,
            }
        })
        .collect();

    if let Some(n) = top {
        entries.sort_by(|a, b| b.total.cmp(&a.total).then(a.id.cmp(&b.id)));
        entries.truncate(n);
    }
    entries
}

/// Execute the dump command
///
/// **Public** - main entry point called from main.rs
pub fn execute_dump(args: DumpArgs) -> Result<()> {
    let record = read_trace(&args.trace)
        .with_context(|| format!("Failed to read {}", args.trace.display()))?;

    let store = match &args.debuginfo {
        Some(dir) => Some(
            DebugInfoStore::open(dir)
                .with_context(|| format!("Failed to open debug info under {}", dir.display()))?,
        ),
        None => None,
    };
    let lookup = store.as_ref().map(|s| s as &dyn SymbolLookup);

    println!("file: {}", args.trace.display());
    println!("cmd:  {}", record.cmdline.replace('\0', " ").trim());
    println!("exe:  {}", record.exe);
    println!("pwd:  {}", record.pwd);
    println!("mode: {}", record.mode.label());
    if let Some(arch) = record.arch {
        println!("arch: {}", arch);
    }
    println!("interval: {}ns", record.interval);
    println!("#buckets: {}", record.buckets);
    println!("Data:");
    println!("\tentries: {}", record.symbols.len());

    let entries = dump_entries(&record, lookup, args.top);
    if record.mode.is_block_mode() {
        println!("\t{:<30} {:<30} {:<10} symbol", "bblid", "fid", "count");
        for e in &entries {
            let fid = e.function_id.map(|f| f.to_string()).unwrap_or_default();
            println!(
                "\t{:<30} {:<30} {:<10} {}",
                e.id,
                fid,
                e.total,
                e.name.as_deref().unwrap_or("")
            );
        }
    } else {
        println!("\t{:<30} {:<10} symbol", "id", "count");
        for e in &entries {
            println!(
                "\t{:<30} {:<10} {}",
                e.id,
                e.total,
                e.name.as_deref().unwrap_or("")
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::SymbolTable;
    use crate::parser::CollectionMode;

    #[test]
    fn test_top_entries_by_total() {
        let mut record = TraceRecord::new("./t", CollectionMode::WallTime, None, 2, 10);
        record.insert_counts(1, vec![1, 0]);
        record.insert_counts(2, vec![4, 1]);
        record.insert_counts(3, vec![0, 2]);
        let table: SymbolTable = vec![(2, "hot".to_string())].into_iter().collect();

        let entries = dump_entries(&record, Some(&table), Some(2));
        let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(entries[0].name.as_deref(), Some("hot"));
        assert_eq!(entries[1].name, None);
    }

    #[test]
    fn test_entries_without_lookup() {
        let mut record = TraceRecord::new("./t", CollectionMode::WallTime, None, 1, 10);
        record.insert_counts(9, vec![3]);
        let entries = dump_entries(&record, None, None);
        assert_eq!(
            entries,
            vec![DumpEntry {
                id: 9,
                function_id: None,
                total: 3,
                name: None
            }]
        );
    }
}
