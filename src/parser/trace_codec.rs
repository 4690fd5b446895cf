//! Binary trace file codec.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! cmdline ETX exe ETX pwd ETX
//! mode:u8 [arch:u8] buckets:u32 interval:u32
//! { id:u64 count:i64 * buckets } *
//! ```
//!
//! The architecture byte is missing from traces written by older runtimes.
//! Decoding tries the canonical header first and falls back to the legacy
//! one only when the canonical reading does not describe the file exactly.

use super::schema::{Arch, CollectionMode, TraceRecord};
use crate::utils::config::STRING_TERMINATOR;
use crate::utils::error::TraceError;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const IN_MEMORY: &str = "<memory>";

/// Which header variant a trace was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFormat {
    /// mode, arch, buckets, interval
    Canonical,
    /// mode, buckets, interval
    Legacy,
}

impl HeaderFormat {
    fn fixed_len(self) -> usize {
        match self {
            HeaderFormat::Canonical => 10,
            HeaderFormat::Legacy => 9,
        }
    }
}

/// Fixed header fields after the three strings
#[derive(Debug, Clone, Copy)]
struct Header {
    format: HeaderFormat,
    mode: CollectionMode,
    arch: Option<Arch>,
    buckets: u32,
    interval: u32,
    group_len: usize,
}

fn read_le32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_le64(data: &[u8], offset: usize) -> [u8; 8] {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[offset..offset + 8]);
    raw
}

/// Decode a trace held in memory
///
/// **Public** - main entry point for decoding
///
/// # Errors
/// * `TraceError::MalformedTrace` - unterminated string, unknown header,
///   trailing partial record or duplicate symbol id
pub fn decode(bytes: &[u8]) -> Result<TraceRecord, TraceError> {
    decode_labeled(IN_MEMORY, bytes)
}

/// Decode a trace, naming `label` in any error
pub fn decode_labeled(label: &str, bytes: &[u8]) -> Result<TraceRecord, TraceError> {
    let mut offset = 0;
    let cmdline = read_terminated(label, bytes, &mut offset, "command line")?;
    let exe = read_terminated(label, bytes, &mut offset, "executable path")?;
    let pwd = read_terminated(label, bytes, &mut offset, "working directory")?;

    let rest = &bytes[offset..];
    let header = detect_header(label, rest)?;
    debug!(
        "{}: {:?} header, mode {:?}, {} buckets of {}ns",
        label, header.format, header.mode, header.buckets, header.interval
    );

    let mut record = TraceRecord::new(cmdline, header.mode, header.arch, header.buckets, header.interval);
    record.exe = exe;
    record.pwd = pwd;

    let body = &rest[header.format.fixed_len()..];
    for group in body.chunks_exact(header.group_len) {
        let id = u64::from_le_bytes(read_le64(group, 0));
        let counts: Vec<i64> = group[8..]
            .chunks_exact(8)
            .map(|c| i64::from_le_bytes(read_le64(c, 0)))
            .collect();

        if !record.insert_counts(id, counts) {
            return Err(TraceError::malformed(
                label,
                format!("symbol id {:#x} appears more than once", id),
            ));
        }
    }

    debug!("{}: decoded {} symbols", label, record.symbols.len());
    Ok(record)
}

/// Read one ETX-terminated string starting at `offset`
///
/// **Private** - internal parsing logic
fn read_terminated(
    label: &str,
    bytes: &[u8],
    offset: &mut usize,
    field: &str,
) -> Result<String, TraceError> {
    let start = *offset;
    let len = bytes[start..]
        .iter()
        .position(|&b| b == STRING_TERMINATOR)
        .ok_or_else(|| TraceError::malformed(label, format!("unterminated {}", field)))?;

    let text = std::str::from_utf8(&bytes[start..start + len])
        .map_err(|e| TraceError::malformed(label, format!("{} is not UTF-8: {}", field, e)))?;

    *offset = start + len + 1;
    Ok(text.to_string())
}

/// Pick the header variant that describes `rest` exactly
///
/// **Private** - tagged-variant detection for decode
fn detect_header(label: &str, rest: &[u8]) -> Result<Header, TraceError> {
    let canonical = parse_header(rest, HeaderFormat::Canonical);
    let canonical_reason = match canonical {
        Ok(header) => return Ok(header),
        Err(reason) => reason,
    };

    match parse_header(rest, HeaderFormat::Legacy) {
        Ok(header) => {
            debug!("{}: canonical header rejected ({}), using legacy layout", label, canonical_reason);
            Ok(header)
        }
        Err(legacy_reason) => Err(TraceError::malformed(
            label,
            format!(
                "canonical header: {}; legacy header: {}",
                canonical_reason, legacy_reason
            ),
        )),
    }
}

/// Read and validate one header variant
///
/// **Private** - returns the reason the variant does not fit
fn parse_header(rest: &[u8], format: HeaderFormat) -> Result<Header, String> {
    let fixed = format.fixed_len();
    if rest.len() < fixed {
        return Err(format!("{} bytes left, header needs {}", rest.len(), fixed));
    }

    let mode = CollectionMode::try_from(rest[0]).map_err(|b| format!("unknown mode {}", b))?;

    let (arch, counts_at) = match format {
        HeaderFormat::Canonical => {
            let arch = Arch::try_from(rest[1]).map_err(|b| format!("unknown architecture {}", b))?;
            (Some(arch), 2)
        }
        HeaderFormat::Legacy => (None, 1),
    };

    let buckets = read_le32(rest, counts_at);
    let interval = read_le32(rest, counts_at + 4);
    if interval == 0 {
        return Err("bucket interval is 0".to_string());
    }

    let group_len = (buckets as usize)
        .checked_add(1)
        .and_then(|n| n.checked_mul(8))
        .ok_or_else(|| format!("bucket count {} overflows record size", buckets))?;

    let remaining = rest.len() - fixed;
    if remaining % group_len != 0 {
        return Err(format!(
            "{} trailing bytes are not a multiple of the {}-byte record size",
            remaining, group_len
        ));
    }

    Ok(Header {
        format,
        mode,
        arch,
        buckets,
        interval,
        group_len,
    })
}

/// Encode a record into the binary layout
///
/// Writes the canonical header when the record carries an architecture,
/// the legacy header otherwise.
///
/// # Errors
/// * `TraceError::MalformedTrace` - a string contains the terminator byte, or a
///   count vector does not have `buckets` entries
pub fn encode(record: &TraceRecord) -> Result<Vec<u8>, TraceError> {
    let label = record.display_name();
    let group_len = (record.buckets as usize + 1) * 8;
    let mut out = Vec::with_capacity(64 + record.symbols.len() * group_len);

    for (field, text) in [
        ("command line", &record.cmdline),
        ("executable path", &record.exe),
        ("working directory", &record.pwd),
    ] {
        if text.as_bytes().contains(&STRING_TERMINATOR) {
            return Err(TraceError::malformed(
                &label,
                format!("{} contains the string terminator", field),
            ));
        }
        out.extend_from_slice(text.as_bytes());
        out.push(STRING_TERMINATOR);
    }

    out.push(record.mode as u8);
    if let Some(arch) = record.arch {
        out.push(arch as u8);
    }
    out.extend_from_slice(&record.buckets.to_le_bytes());
    out.extend_from_slice(&record.interval.to_le_bytes());

    for (id, series) in &record.symbols {
        if series.counts.len() != record.buckets as usize {
            return Err(TraceError::malformed(
                &label,
                format!(
                    "symbol {:#x} has {} counts, expected {}",
                    id,
                    series.counts.len(),
                    record.buckets
                ),
            ));
        }
        out.extend_from_slice(&id.to_le_bytes());
        for count in &series.counts {
            out.extend_from_slice(&count.to_le_bytes());
        }
    }

    Ok(out)
}

/// Read and decode one trace file
pub fn read_trace(path: impl AsRef<Path>) -> Result<TraceRecord, TraceError> {
    let path = path.as_ref();
    let label = path.display().to_string();

    let bytes = fs::read(path).map_err(|source| TraceError::Io {
        path: label.clone(),
        source,
    })?;

    let mut record = decode_labeled(&label, &bytes)?;
    record.source_path = path.to_path_buf();
    Ok(record)
}

/// Encode a record and write it to disk
pub fn write_trace(record: &TraceRecord, path: impl AsRef<Path>) -> Result<(), TraceError> {
    let path = path.as_ref();
    let bytes = encode(record)?;
    fs::write(path, bytes).map_err(|source| TraceError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Outcome of decoding a set of files
#[derive(Debug)]
pub struct DecodedBatch {
    pub records: Vec<TraceRecord>,
    pub failures: Vec<TraceError>,
}

/// Decode every file, isolating per-file failures
///
/// A malformed file voids only itself; the batch fails when no file decodes.
pub fn decode_batch(paths: &[PathBuf]) -> Result<DecodedBatch, TraceError> {
    let mut records = Vec::with_capacity(paths.len());
    let mut failures = Vec::new();

    for path in paths {
        match read_trace(path) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping trace: {}", e);
                failures.push(e);
            }
        }
    }

    if records.is_empty() {
        return Err(TraceError::EmptyBatch {
            attempted: paths.len(),
            failed: failures.len(),
        });
    }

    info!("Decoded {} of {} trace files", records.len(), paths.len());
    Ok(DecodedBatch { records, failures })
}
