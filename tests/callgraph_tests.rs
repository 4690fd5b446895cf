//! Integration tests for sampled-trace reconstruction and edge ranking

use pretty_assertions::assert_eq;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use xarch_perf::callgraph::{
    accumulate_activity, build_sampled_trace, rank_divergent_edges, resolve_chain, CallEdge,
    CallPath, CallPathArena, CallSample, ResolvedSample,
};
use xarch_perf::lookup::SymbolTable;
use xarch_perf::matcher::find_pairs;
use xarch_perf::parser::{CollectionMode, Histogram};
use xarch_perf::utils::error::CallGraphError;

fn node(id: u64, parent_id: u64, symbol_id: u64) -> CallPath {
    CallPath {
        id,
        parent_id,
        symbol_id,
    }
}

fn sample(sample_id: u64, symbol_id: u64, call_path_id: u64) -> CallSample {
    CallSample {
        sample_id,
        command_id: 1,
        module_id: 1,
        symbol_id,
        ip: 0,
        timestamp: 0,
        call_path_id,
    }
}

/// Write a perf export database and its raw dump
///
/// Symbols: 1 main, 2 parse, 3 unknown, 4 lex. Call paths form
/// root -> main -> parse -> lex. `samples` rows are
/// `(id, symbol_id, time, call_path_id)`.
fn create_sampled_export(dir: &Path, name: &str, cmdline: &str, samples: &[(i64, i64, i64, i64)]) -> PathBuf {
    let sqlite_dir = dir.join("perf_data").join("sqlite");
    let raw_dir = dir.join("perf_data").join("raw");
    fs::create_dir_all(&sqlite_dir).unwrap();
    fs::create_dir_all(&raw_dir).unwrap();

    let db_path = sqlite_dir.join(format!("{}.perf.data.db", name));
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE samples (id INTEGER PRIMARY KEY, comm_id INTEGER, dso_id INTEGER,
                               symbol_id INTEGER, ip INTEGER, time INTEGER, call_path_id INTEGER);
         CREATE TABLE symbols (id INTEGER PRIMARY KEY, name TEXT);
         CREATE TABLE call_paths (id INTEGER PRIMARY KEY, parent_id INTEGER, symbol_id INTEGER);
         INSERT INTO symbols VALUES (1, 'main'), (2, 'parse'), (3, 'unknown'), (4, 'lex');
         INSERT INTO call_paths VALUES (1, 0, 0), (2, 1, 1), (3, 2, 2), (4, 3, 4);
         INSERT INTO samples VALUES (0, 0, 0, 0, 0, 0, 0);",
    )
    .unwrap();
    for &(id, symbol_id, time, call_path_id) in samples {
        conn.execute(
            "INSERT INTO samples VALUES (?1, 1, 1, ?2, 0, ?3, ?4)",
            [id, symbol_id, time, call_path_id],
        )
        .unwrap();
    }

    fs::write(
        raw_dir.join(format!("{}.perf.data.raw", name)),
        format!("# ========\n# cmdline : {}\n# ========\n", cmdline),
    )
    .unwrap();

    db_path
}

/// main, then parse for 11us, then lex inside parse for 7us
const GZIP_SAMPLES: [(i64, i64, i64, i64); 5] = [
    (1, 1, 0, 2),
    (2, 2, 1000, 3),
    (3, 1, 12000, 2),
    (4, 4, 13000, 4),
    (5, 1, 20000, 2),
];

fn raw_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir.join("perf_data").join("raw"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

// ============================================================================
// Call-path resolution
// ============================================================================

#[test]
fn test_chain_skips_unknown_ancestor() {
    let symbols: SymbolTable = vec![
        (1, "main".to_string()),
        (2, "unknown".to_string()),
        (3, "work".to_string()),
    ]
    .into_iter()
    .collect();
    let arena: CallPathArena = vec![node(1, 0, 0), node(2, 1, 1), node(3, 2, 2), node(4, 3, 3)]
        .into_iter()
        .collect();

    let chain = resolve_chain(&sample(1, 3, 4), &symbols, &arena).unwrap();
    assert_eq!(chain, vec![3, 1]);
}

#[test]
fn test_chain_with_only_unknown_ancestors() {
    let symbols: SymbolTable = vec![(2, "unknown".to_string()), (3, "work".to_string())]
        .into_iter()
        .collect();
    // root <- unknown <- unknown <- work
    let arena: CallPathArena = vec![node(1, 0, 0), node(2, 1, 2), node(3, 2, 2), node(4, 3, 3)]
        .into_iter()
        .collect();

    let chain = resolve_chain(&sample(1, 3, 4), &symbols, &arena).unwrap();
    assert_eq!(chain, vec![3]);
}

#[test]
fn test_chain_with_missing_parent_is_broken() {
    let symbols: SymbolTable = vec![(1, "main".to_string())].into_iter().collect();
    let arena: CallPathArena = vec![node(2, 9, 1)].into_iter().collect();

    let result = resolve_chain(&sample(7, 1, 2), &symbols, &arena);
    assert!(matches!(
        result,
        Err(CallGraphError::BrokenCallPath {
            sample_id: 7,
            call_path_id: 9
        })
    ));
}

// ============================================================================
// Activity accumulation
// ============================================================================

#[test]
fn test_activity_aligned_to_bucket_start() {
    let samples = vec![
        ResolvedSample {
            sample_id: 1,
            timestamp: 0,
            chain: vec![7, 1],
        },
        ResolvedSample {
            sample_id: 2,
            timestamp: 1000,
            chain: vec![7, 1],
        },
        ResolvedSample {
            sample_id: 3,
            timestamp: 6000,
            chain: vec![1],
        },
    ];

    let histograms = accumulate_activity(&samples, 5000).unwrap();
    let expected: Histogram = [(5000, 1)].into_iter().collect();
    assert_eq!(histograms.get(&7), Some(&expected));
}

#[test]
fn test_activity_rejects_time_going_backwards() {
    let samples = vec![
        ResolvedSample {
            sample_id: 1,
            timestamp: 500,
            chain: vec![1],
        },
        ResolvedSample {
            sample_id: 2,
            timestamp: 100,
            chain: vec![1],
        },
    ];

    let result = accumulate_activity(&samples, 100);
    assert!(matches!(result, Err(CallGraphError::OutOfOrderSample { sample_id: 2, .. })));
}

// ============================================================================
// Sampled database ingestion
// ============================================================================

#[test]
fn test_build_sampled_trace_from_export() {
    let dir = tempdir().unwrap();
    let db = create_sampled_export(dir.path(), "gzip", "./gzip -9 input", &GZIP_SAMPLES);

    let trace = build_sampled_trace(&db, &raw_files(dir.path()), 5000).unwrap();
    let record = &trace.record;

    assert_eq!(record.cmdline, "./gzip -9 input");
    assert_eq!(record.mode, CollectionMode::SampledPerf);
    assert_eq!(record.interval, 5000);
    assert_eq!(record.buckets, 3);
    assert_eq!(record.source_path, db);

    // parse: one 11us and one 7us activation
    assert_eq!(record.series(2).unwrap().counts, vec![0, 1, 1]);
    // lex: one 7us activation
    assert_eq!(record.series(4).unwrap().counts, vec![0, 1, 0]);
    // main never leaves the stack
    assert!(record.series(1).is_none());

    assert_eq!(trace.chains.len(), 5);
    assert_eq!(trace.chains[3], vec![4, 2, 1]);
    assert_eq!(trace.symbols.get(4), Some("lex"));
}

#[test]
fn test_export_without_command_line_fails() {
    let dir = tempdir().unwrap();
    let db = create_sampled_export(dir.path(), "gzip", "./gzip", &GZIP_SAMPLES);
    let raw = dir.path().join("perf_data").join("raw").join("gzip.perf.data.raw");
    fs::write(&raw, "# no header\n").unwrap();

    let result = build_sampled_trace(&db, &[raw], 5000);
    assert!(matches!(result, Err(CallGraphError::MissingCommandLine(_))));
}

// ============================================================================
// Conformity ranking
// ============================================================================

#[test]
fn test_rank_edges_across_architectures() {
    let dir_a = tempdir().unwrap();
    let dir_b = tempdir().unwrap();
    let db_a = create_sampled_export(dir_a.path(), "gzip", "./gzip", &GZIP_SAMPLES);
    // Same program, lex never sampled on the second architecture
    let db_b = create_sampled_export(
        dir_b.path(),
        "gzip",
        "./gzip",
        &[(1, 1, 0, 2), (2, 2, 1000, 3), (3, 1, 12000, 2)],
    );

    let traces_a = vec![build_sampled_trace(&db_a, &raw_files(dir_a.path()), 5000).unwrap()];
    let traces_b = vec![build_sampled_trace(&db_b, &raw_files(dir_b.path()), 5000).unwrap()];
    let pairing = find_pairs(&traces_a, &traces_b);
    assert_eq!(pairing.pairs.len(), 1);

    let ranked = rank_divergent_edges(&pairing.pairs, 10, 10).unwrap();
    // side a: main->parse twice, parse->lex once; side b: main->parse once
    assert_eq!(ranked.len(), 2);
    for delta in &ranked {
        assert_eq!(delta.delta, 1);
    }
    let edges: Vec<&CallEdge> = ranked.iter().map(|d| &d.edge).collect();
    assert!(edges.contains(&&CallEdge {
        caller: "parse".to_string(),
        callee: "lex".to_string(),
    }));
    assert!(edges.contains(&&CallEdge {
        caller: "main".to_string(),
        callee: "parse".to_string(),
    }));
}

#[test]
fn test_rank_edges_respects_top_n() {
    let dir = tempdir().unwrap();
    let db = create_sampled_export(dir.path(), "gzip", "./gzip", &GZIP_SAMPLES);
    let trace = build_sampled_trace(&db, &raw_files(dir.path()), 5000).unwrap();
    let empty = xarch_perf::callgraph::SampledTrace {
        record: trace.record.clone(),
        symbols: trace.symbols.clone(),
        chains: Vec::new(),
    };

    let ranked = rank_divergent_edges(&[(&trace, &empty)], 10, 1).unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(
        ranked[0].edge,
        CallEdge {
            caller: "main".to_string(),
            callee: "parse".to_string(),
        }
    );
    assert_eq!(ranked[0].delta, 2);
}
