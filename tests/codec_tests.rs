//! Integration tests for the binary trace codec

use pretty_assertions::assert_eq;
use std::fs;
use tempfile::{tempdir, NamedTempFile};
use xarch_perf::parser::{
    decode, decode_batch, decode_function_id, encode, encode_function_id, read_trace,
    write_trace, Arch, CollectionMode, TraceRecord,
};
use xarch_perf::utils::error::TraceError;

/// Helper to create a small two-symbol trace
fn create_test_record(arch: Option<Arch>) -> TraceRecord {
    let mut record = TraceRecord::new("./gzip\0-9\0input", CollectionMode::WallTime, arch, 3, 5000);
    record.exe = "/usr/bin/gzip".to_string();
    record.pwd = "/tmp/run".to_string();
    record.insert_counts(encode_function_id(0, 1, 1), vec![0, 4, 1]);
    record.insert_counts(encode_function_id(0, 2, 1), vec![7, 0, 0]);
    record
}

/// Raw bytes of a legacy trace: no architecture byte in the header
fn legacy_bytes() -> Vec<u8> {
    let mut bytes = b"./t\x03/bin/t\x03/\x03".to_vec();
    bytes.push(CollectionMode::Cycle as u8);
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&100u32.to_le_bytes());
    bytes.extend_from_slice(&42u64.to_le_bytes());
    bytes.extend_from_slice(&3i64.to_le_bytes());
    bytes.extend_from_slice(&0i64.to_le_bytes());
    bytes
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_write_and_read_canonical_trace() {
    let record = create_test_record(Some(Arch::Riscv64));
    let temp_file = NamedTempFile::new().unwrap();

    // Write
    write_trace(&record, temp_file.path()).unwrap();

    // Read back
    let decoded = read_trace(temp_file.path()).unwrap();
    assert_eq!(decoded.cmdline, record.cmdline);
    assert_eq!(decoded.exe, "/usr/bin/gzip");
    assert_eq!(decoded.pwd, "/tmp/run");
    assert_eq!(decoded.arch, Some(Arch::Riscv64));
    assert_eq!(decoded.buckets, 3);
    assert_eq!(decoded.interval, 5000);
    assert_eq!(decoded.symbols, record.symbols);
    assert_eq!(decoded.source_path, temp_file.path());
}

#[test]
fn test_record_without_arch_uses_legacy_header() {
    let record = create_test_record(None);
    let bytes = encode(&record).unwrap();
    let canonical = encode(&create_test_record(Some(Arch::X64))).unwrap();
    assert_eq!(canonical.len(), bytes.len() + 1);

    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded.arch, None);
    assert_eq!(decoded.symbols, record.symbols);
}

#[test]
fn test_decode_handwritten_legacy_trace() {
    let record = decode(&legacy_bytes()).unwrap();

    assert_eq!(record.cmdline, "./t");
    assert_eq!(record.mode, CollectionMode::Cycle);
    assert_eq!(record.arch, None);
    assert_eq!(record.buckets, 2);
    assert_eq!(record.interval, 100);

    let series = record.series(42).unwrap();
    assert_eq!(series.counts, vec![3, 0]);
    assert_eq!(series.histogram.get(&0), Some(&3));
    assert_eq!(series.populated_buckets(), 1);
}

#[test]
fn test_empty_trace_has_no_symbols() {
    let record = TraceRecord::new("./idle", CollectionMode::WallTime, Some(Arch::Arm64), 4, 10);
    let decoded = decode(&encode(&record).unwrap()).unwrap();
    assert!(decoded.symbols.is_empty());
    assert_eq!(decoded.buckets, 4);
}

#[test]
fn test_function_id_components() {
    let id = encode_function_id(3, 0x12_3456, 0xab_cdef);
    assert_eq!(decode_function_id(id), (3, 0x12_3456, 0xab_cdef));
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_truncated_trace_rejected() {
    let mut bytes = legacy_bytes();
    bytes.truncate(bytes.len() - 3);

    let result = decode(&bytes);
    assert!(matches!(result, Err(TraceError::MalformedTrace { .. })));
}

#[test]
fn test_unterminated_string_rejected() {
    let result = decode(b"./t\x03/bin/t");
    assert!(matches!(result, Err(TraceError::MalformedTrace { .. })));
}

#[test]
fn test_terminator_in_command_line_not_encodable() {
    let record = TraceRecord::new("a\x03b", CollectionMode::WallTime, None, 1, 1);
    assert!(encode(&record).is_err());
}

#[test]
fn test_batch_skips_malformed_files() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("trec_perf_good");
    let bad = dir.path().join("trec_perf_bad");

    write_trace(&create_test_record(Some(Arch::X64)), &good).unwrap();
    fs::write(&bad, b"garbage without terminators").unwrap();

    let batch = decode_batch(&[good.clone(), bad]).unwrap();
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.records[0].source_path, good);
}

#[test]
fn test_batch_fails_when_nothing_decodes() {
    let dir = tempdir().unwrap();
    let bad = dir.path().join("trec_perf_bad");
    fs::write(&bad, b"\x03").unwrap();

    let result = decode_batch(&[bad]);
    assert!(matches!(
        result,
        Err(TraceError::EmptyBatch {
            attempted: 1,
            failed: 1
        })
    ));
}
