//! Function and basic-block matching inside matched testcases.
//!
//! Symbol ids are local to one build, so symbols are matched by their
//! resolved names. Blocks are matched within a function by source lines.

use crate::lookup::{symbol_name, LineRange, SymbolLookup};
use crate::parser::{SymbolSeries, TraceRecord};
use crate::utils::error::MatchError;
use log::debug;
use std::collections::HashMap;

/// One trace together with the lookup that names its symbols
#[derive(Clone, Copy)]
pub struct TraceSide<'a> {
    pub record: &'a TraceRecord,
    pub lookup: &'a dyn SymbolLookup,
}

impl<'a> TraceSide<'a> {
    pub fn new(record: &'a TraceRecord, lookup: &'a dyn SymbolLookup) -> Self {
        Self { record, lookup }
    }
}

/// A symbol present under one name in both traces
#[derive(Debug, Clone)]
pub struct FunctionMatch<'a> {
    pub name: String,
    pub id_a: u64,
    pub id_b: u64,
    pub series_a: &'a SymbolSeries,
    pub series_b: &'a SymbolSeries,
}

/// A block of the same function covering the same lines in both traces
#[derive(Debug, Clone)]
pub struct BlockMatch<'a> {
    /// Owning function name
    pub function: String,
    pub lines: LineRange,
    pub block_a: u64,
    pub block_b: u64,
    /// Composite id of the owning function on each side
    pub function_a: u64,
    pub function_b: u64,
    pub series_a: &'a SymbolSeries,
    pub series_b: &'a SymbolSeries,
}

/// One name resolved in every trace of an N-way group
#[derive(Debug, Clone)]
pub struct FunctionGroup<'a> {
    pub name: String,
    /// `(symbol id, series)` per trace, in input order
    pub members: Vec<(u64, &'a SymbolSeries)>,
}

/// A named symbol of one trace
struct NamedSymbol<'a> {
    name: String,
    id: u64,
    series: &'a SymbolSeries,
}

/// Name every symbol with enough populated buckets
///
/// **Private** - symbols come out in ascending id order; when two ids share
/// a name only the first is kept
fn named_symbols<'a>(
    side: &TraceSide<'a>,
    min_populated: usize,
) -> Result<Vec<NamedSymbol<'a>>, MatchError> {
    let record: &'a TraceRecord = side.record;
    let mut seen: HashMap<String, u64> = HashMap::new();
    let mut out = Vec::new();

    for (&id, series) in &record.symbols {
        if series.populated_buckets() < min_populated {
            continue;
        }

        let name = symbol_name(record, id, side.lookup)?;
        if let Some(first) = seen.get(&name) {
            debug!(
                "{}: {} shared by {:#x} and {:#x}, keeping the first",
                record.display_name(),
                name,
                first,
                id
            );
            continue;
        }

        seen.insert(name.clone(), id);
        out.push(NamedSymbol { name, id, series });
    }

    Ok(out)
}

/// Match functions of two traces by resolved name
///
/// **Public** - main entry point for pairwise function matching
///
/// # Arguments
/// * `a`, `b` - The two sides of a matched testcase
/// * `min_populated` - Symbols with fewer non-zero buckets are ignored
///
/// # Returns
/// Matches in ascending id order of side `a`
///
/// # Errors
/// * `MatchError::Lookup` - a name could not be resolved
pub fn match_functions<'a>(
    a: TraceSide<'a>,
    b: TraceSide<'a>,
    min_populated: usize,
) -> Result<Vec<FunctionMatch<'a>>, MatchError> {
    let left = named_symbols(&a, min_populated)?;
    let right: HashMap<String, NamedSymbol<'a>> = named_symbols(&b, min_populated)?
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();

    let matches: Vec<FunctionMatch<'a>> = left
        .into_iter()
        .filter_map(|l| {
            right.get(&l.name).map(|r| FunctionMatch {
                id_a: l.id,
                id_b: r.id,
                series_a: l.series,
                series_b: r.series,
                name: l.name,
            })
        })
        .collect();

    debug!(
        "{}: {} functions matched by name",
        a.record.display_name(),
        matches.len()
    );
    Ok(matches)
}

/// Blocks of one trace grouped by owning function name
struct FunctionBlocks<'a> {
    name: String,
    blocks: Vec<BlockInfo<'a>>,
}

struct BlockInfo<'a> {
    block_id: u64,
    function_id: u64,
    lines: LineRange,
    series: &'a SymbolSeries,
}

/// Group blocks by owning function, in first-seen order
///
/// **Private** - block-mode traces only
fn blocks_by_function<'a>(
    side: &TraceSide<'a>,
    min_populated: usize,
) -> Result<Vec<FunctionBlocks<'a>>, MatchError> {
    let mut groups: Vec<FunctionBlocks<'a>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let record: &'a TraceRecord = side.record;

    for (&block_id, series) in &record.symbols {
        if series.populated_buckets() < min_populated {
            continue;
        }

        let function_id = side.lookup.block_function_id(block_id)?;
        let name = side.lookup.function_name(function_id)?;
        let lines = side.lookup.block_lines(block_id)?;

        let slot = *index.entry(name.clone()).or_insert_with(|| {
            groups.push(FunctionBlocks {
                name,
                blocks: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].blocks.push(BlockInfo {
            block_id,
            function_id,
            lines,
            series,
        });
    }

    Ok(groups)
}

/// Match basic blocks of two block-mode traces
///
/// Blocks are first grouped by owning function name; within a function each
/// block of side `a` takes the first unused block of side `b` covering the
/// same line range.
///
/// # Errors
/// * `MatchError::Lookup` - a block or function could not be resolved
pub fn match_blocks<'a>(
    a: TraceSide<'a>,
    b: TraceSide<'a>,
    min_populated: usize,
) -> Result<Vec<BlockMatch<'a>>, MatchError> {
    let left = blocks_by_function(&a, min_populated)?;
    let mut right: HashMap<String, Vec<(BlockInfo<'a>, bool)>> = blocks_by_function(&b, min_populated)?
        .into_iter()
        .map(|g| (g.name, g.blocks.into_iter().map(|blk| (blk, false)).collect()))
        .collect();

    let mut matches = Vec::new();
    for group in left {
        let Some(candidates) = right.get_mut(&group.name) else {
            continue;
        };

        for block in group.blocks {
            let partner = candidates
                .iter_mut()
                .find(|(other, used)| !*used && other.lines == block.lines);

            if let Some((other, used)) = partner {
                *used = true;
                matches.push(BlockMatch {
                    function: group.name.clone(),
                    lines: block.lines,
                    block_a: block.block_id,
                    block_b: other.block_id,
                    function_a: block.function_id,
                    function_b: other.function_id,
                    series_a: block.series,
                    series_b: other.series,
                });
            }
        }
    }

    debug!(
        "{}: {} blocks matched by line range",
        a.record.display_name(),
        matches.len()
    );
    Ok(matches)
}

/// Match functions across N traces of one testcase
///
/// Groups follow the name order of the first trace and only cover names
/// resolved in every trace.
///
/// # Errors
/// * `MatchError::Lookup` - a name could not be resolved
pub fn match_functions_n<'a>(
    sides: &[TraceSide<'a>],
    min_populated: usize,
) -> Result<Vec<FunctionGroup<'a>>, MatchError> {
    let named: Vec<Vec<NamedSymbol<'a>>> = sides
        .iter()
        .map(|side| named_symbols(side, min_populated))
        .collect::<Result<_, _>>()?;

    let Some((first, rest)) = named.split_first() else {
        return Ok(Vec::new());
    };

    let rest_index: Vec<HashMap<&str, &NamedSymbol<'a>>> = rest
        .iter()
        .map(|symbols| symbols.iter().map(|s| (s.name.as_str(), s)).collect())
        .collect();

    let mut groups = Vec::new();
    for symbol in first {
        if !rest_index.iter().all(|idx| idx.contains_key(symbol.name.as_str())) {
            continue;
        }

        let mut members = vec![(symbol.id, symbol.series)];
        members.extend(
            rest_index
                .iter()
                .filter_map(|idx| idx.get(symbol.name.as_str()))
                .map(|s| (s.id, s.series)),
        );

        groups.push(FunctionGroup {
            name: symbol.name.clone(),
            members,
        });
    }

    debug!("{} functions common to {} traces", groups.len(), sides.len());
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::SymbolTable;
    use crate::parser::CollectionMode;

    fn record(symbols: &[(u64, Vec<i64>)]) -> TraceRecord {
        let mut r = TraceRecord::new("./t", CollectionMode::SampledPerf, None, 3, 10);
        for (id, counts) in symbols {
            r.insert_counts(*id, counts.clone());
        }
        r
    }

    fn table(names: &[(u64, &str)]) -> SymbolTable {
        names.iter().map(|(id, n)| (*id, n.to_string())).collect()
    }

    #[test]
    fn test_match_by_name_with_populated_filter() {
        let ra = record(&[(1, vec![1, 1, 0]), (2, vec![0, 0, 5]), (3, vec![2, 0, 2])]);
        let rb = record(&[(7, vec![3, 3, 0]), (8, vec![1, 1, 1]), (9, vec![0, 1, 1])]);
        let ta = table(&[(1, "main"), (2, "idle"), (3, "parse")]);
        let tb = table(&[(7, "main"), (8, "idle"), (9, "lex")]);

        let matches =
            match_functions(TraceSide::new(&ra, &ta), TraceSide::new(&rb, &tb), 2).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "main");
        assert_eq!((matches[0].id_a, matches[0].id_b), (1, 7));
    }

    #[test]
    fn test_duplicate_names_keep_first_id() {
        let ra = record(&[(1, vec![1, 1, 0]), (2, vec![4, 4, 0])]);
        let rb = record(&[(5, vec![1, 1, 0])]);
        let ta = table(&[(1, "dup"), (2, "dup")]);
        let tb = table(&[(5, "dup")]);

        let matches =
            match_functions(TraceSide::new(&ra, &ta), TraceSide::new(&rb, &tb), 0).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id_a, 1);
    }

    #[test]
    fn test_missing_name_is_lookup_error() {
        let ra = record(&[(1, vec![1, 1, 0])]);
        let ta = SymbolTable::new();
        let err = match_functions(TraceSide::new(&ra, &ta), TraceSide::new(&ra, &ta), 0)
            .unwrap_err();
        assert!(matches!(err, MatchError::Lookup(_)));
    }

    #[test]
    fn test_n_way_groups() {
        let r1 = record(&[(1, vec![1, 0, 0]), (2, vec![0, 1, 0])]);
        let r2 = record(&[(3, vec![2, 0, 0]), (4, vec![0, 2, 0])]);
        let r3 = record(&[(5, vec![3, 0, 0])]);
        let t1 = table(&[(1, "a"), (2, "b")]);
        let t2 = table(&[(3, "b"), (4, "a")]);
        let t3 = table(&[(5, "a")]);

        let sides = [
            TraceSide::new(&r1, &t1),
            TraceSide::new(&r2, &t2),
            TraceSide::new(&r3, &t3),
        ];
        let groups = match_functions_n(&sides, 0).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "a");
        let ids: Vec<u64> = groups[0].members.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 4, 5]);
    }
}
