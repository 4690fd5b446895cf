use pretty_assertions::assert_eq;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use xarch_perf::aggregator::{aggregate_testcase, grand_totals};
use xarch_perf::commands::{execute_aggregate, AggregateArgs};
use xarch_perf::compare::RunScorer;
use xarch_perf::lookup::SymbolTable;
use xarch_perf::matcher::TraceSide;
use xarch_perf::parser::{encode_function_id, write_trace, Arch, CollectionMode, TraceRecord};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn names() -> SymbolTable {
    vec![(1, "f".to_string()), (2, "g".to_string()), (3, "h".to_string())]
        .into_iter()
        .collect()
}

/// One run of `./bench`: f varies per run, g is stable
fn create_run(f: Vec<i64>) -> TraceRecord {
    let mut record = TraceRecord::new("./bench", CollectionMode::WallTime, Some(Arch::X64), 3, 10);
    record.insert_counts(1, f);
    record.insert_counts(2, vec![0, 0, 4]);
    record
}

#[test]
fn test_three_runs_two_functions() {
    let table = names();
    let runs = vec![
        create_run(vec![1, 0, 0]),
        create_run(vec![2, 0, 0]),
        create_run(vec![0, 3, 0]),
    ];
    let sides: Vec<TraceSide<'_>> = runs.iter().map(|r| TraceSide::new(r, &table)).collect();

    let aggregate = aggregate_testcase(&sides, 0).unwrap();
    assert_eq!(aggregate.command_line, "./bench");
    assert_eq!(aggregate.runs, 3);
    assert_eq!(aggregate.functions.len(), 2);

    let f = &aggregate.functions[0];
    assert_eq!(f.name, "f");
    let total = f.summary(RunScorer::SumTime).unwrap();
    assert_eq!(total.per_run, vec![2.0, 4.0, 3.0]);
    assert_eq!(total.sum, 9.0);
    assert_eq!(total.mean, 3.0);
    assert!(approx(f.mean(RunScorer::YOverX), 1.5));
    assert!(approx(f.mean(RunScorer::InverseXOverY), 1.5));
    assert_eq!(f.summed_counts, vec![3, 3, 0]);

    let g = &aggregate.functions[1];
    assert_eq!(g.name, "g");
    assert_eq!(g.mean(RunScorer::SumTime), 0.0);
    assert_eq!(g.summed_counts, vec![0, 0, 12]);

    // Totals are sums of the per-function means
    for scorer in RunScorer::ALL {
        let expected: f64 = aggregate.functions.iter().map(|func| func.mean(scorer)).sum();
        assert!(approx(aggregate.totals.sum_of_means(scorer), expected));
    }
}

#[test]
fn test_function_missing_from_one_run_is_dropped() {
    let table = names();
    let mut runs = vec![create_run(vec![1, 0, 0]), create_run(vec![1, 0, 0])];
    runs[0].insert_counts(3, vec![5, 0, 0]);
    let sides: Vec<TraceSide<'_>> = runs.iter().map(|r| TraceSide::new(r, &table)).collect();

    let aggregate = aggregate_testcase(&sides, 0).unwrap();
    let names: Vec<&str> = aggregate.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["f", "g"]);
}

#[test]
fn test_grand_totals_across_testcases() {
    let table = names();
    let first = vec![create_run(vec![1, 0, 0]), create_run(vec![1, 0, 0])];
    let second = vec![create_run(vec![0, 2, 0]), create_run(vec![0, 4, 0])];

    let aggregates: Vec<_> = [&first, &second]
        .iter()
        .map(|runs| {
            let sides: Vec<TraceSide<'_>> = runs.iter().map(|r| TraceSide::new(r, &table)).collect();
            aggregate_testcase(&sides, 0).unwrap()
        })
        .collect();

    let totals = grand_totals(&aggregates);
    // f: mean 2 then mean 3, g: 0 in both
    assert_eq!(totals.sum_of_means(RunScorer::SumTime), 5.0);
    let total = totals.get(RunScorer::SumTime).unwrap();
    assert_eq!(total.sum_of_sums, 10.0);
}

// ============================================================================
// Aggregate command end to end
// ============================================================================

fn create_run_dir(dir: &Path, f: Vec<i64>) {
    let debuginfo = dir.join("debuginfo");
    fs::create_dir_all(&debuginfo).unwrap();
    let conn = Connection::open(debuginfo.join("debuginfo0.db")).unwrap();
    conn.execute_batch(
        "CREATE TABLE FILENAMES (ID INTEGER PRIMARY KEY AUTOINCREMENT, NAME CHAR(2048));
         CREATE TABLE FUNCNAMES (ID INTEGER PRIMARY KEY AUTOINCREMENT, NAME CHAR(256));
         CREATE TABLE BBLS (ID INTEGER PRIMARY KEY AUTOINCREMENT, FID INTEGER, LINESTART INTEGER, LINEEND INTEGER);
         INSERT INTO FILENAMES VALUES (1, 'bench.c');
         INSERT INTO FUNCNAMES VALUES (1, 'f: 3'), (2, 'g: 9');",
    )
    .unwrap();

    let data = dir.join("perf_data");
    fs::create_dir_all(&data).unwrap();
    let mut record = TraceRecord::new("./bench", CollectionMode::WallTime, Some(Arch::X64), 3, 10);
    record.insert_counts(encode_function_id(0, 1, 1), f);
    record.insert_counts(encode_function_id(0, 2, 1), vec![0, 0, 4]);
    write_trace(&record, data.join("trec_perf_bench")).unwrap();
}

#[test]
fn test_aggregate_command_writes_csv() {
    let root = tempdir().unwrap();
    let dirs: Vec<_> = (0..3).map(|i| root.path().join(format!("run{}", i))).collect();
    create_run_dir(&dirs[0], vec![1, 0, 0]);
    create_run_dir(&dirs[1], vec![2, 0, 0]);
    create_run_dir(&dirs[2], vec![0, 3, 0]);
    let output_dir = root.path().join("scores");

    execute_aggregate(AggregateArgs {
        dirs,
        data_dir: "perf_data".to_string(),
        output_dir: output_dir.clone(),
    })
    .unwrap();

    let tuple = fs::read_to_string(output_dir.join("0.csv")).unwrap();
    let lines: Vec<&str> = tuple.lines().collect();
    assert_eq!(lines[0], "cmd: ./bench");
    assert_eq!(
        lines[1],
        "symbol,score_total,score_avg,score 1,score 2,score 3,score_y/x,score_1/(x/y),data"
    );
    assert!(lines[2].starts_with("f: 3,9.0,3.0,2.0,4.0,3.0,1.5,"));
    assert!(lines[2].ends_with(",3,3,0"));
    assert_eq!(lines[4], "sum_total,3.0");

    let total = fs::read_to_string(output_dir.join("total.csv")).unwrap();
    let rows: Vec<&str> = total.lines().collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], "sum_total,3.0");
    assert!(rows[1].starts_with("sum_y/x,"));
    assert!(rows[2].starts_with("sum_1/(x/y),"));
}

#[test]
fn test_aggregate_needs_two_dirs() {
    let root = tempdir().unwrap();
    let result = execute_aggregate(AggregateArgs {
        dirs: vec![root.path().to_path_buf()],
        data_dir: "perf_data".to_string(),
        output_dir: root.path().to_path_buf(),
    });
    assert!(result.is_err());
}
