//! In-memory representation of decoded trace files.
//!
//! A `TraceRecord` is one process execution: its identity (command line,
//! executable, working directory), how it was measured, and one raw
//! count vector per symbol.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// How the instrumentation runtime measured the process
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionMode {
    WallTime = 0,
    Cycle = 1,
    Instruction = 2,
    SampledPerf = 3,
    BasicBlockTime = 4,
}

impl TryFrom<u8> for CollectionMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::WallTime),
            1 => Ok(Self::Cycle),
            2 => Ok(Self::Instruction),
            3 => Ok(Self::SampledPerf),
            4 => Ok(Self::BasicBlockTime),
            other => Err(other),
        }
    }
}

impl CollectionMode {
    /// Symbol ids in this mode are composite block keys
    pub fn is_block_mode(self) -> bool {
        self == CollectionMode::BasicBlockTime
    }

    pub fn label(self) -> &'static str {
        match self {
            CollectionMode::WallTime => "time",
            CollectionMode::Cycle => "cycle",
            CollectionMode::Instruction => "instruction",
            CollectionMode::SampledPerf => "perf command",
            CollectionMode::BasicBlockTime => "time bbl",
        }
    }
}

/// Architecture the trace was collected on
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Arch {
    X64 = 0,
    Riscv64 = 1,
    Arm64 = 2,
}

impl TryFrom<u8> for Arch {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::X64),
            1 => Ok(Self::Riscv64),
            2 => Ok(Self::Arm64),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Arch::X64 => "X64",
            Arch::Riscv64 => "RISCV64",
            Arch::Arm64 => "ARM64",
        };
        f.write_str(name)
    }
}

/// Sparse histogram: bucket start time (ns) -> positive count
pub type Histogram = BTreeMap<u64, i64>;

/// Raw and sparse data for one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSeries {
    /// Dense per-bucket counts, length == record bucket count
    pub counts: Vec<i64>,

    /// Only the buckets with a positive count
    pub histogram: Histogram,
}

impl SymbolSeries {
    /// Derive the sparse histogram from dense counts
    ///
    /// Bucket `j` starts at `j * interval`.
    pub fn from_counts(counts: Vec<i64>, interval: u32) -> Self {
        let histogram = counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(j, &c)| (j as u64 * u64::from(interval), c))
            .collect();

        Self { counts, histogram }
    }

    /// Number of buckets with a positive count
    pub fn populated_buckets(&self) -> usize {
        self.histogram.len()
    }

    /// Sum of all positive counts
    pub fn total_count(&self) -> i64 {
        self.histogram.values().sum()
    }
}

/// One decoded trace file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    /// Path the trace was read from (empty for in-memory records)
    pub source_path: PathBuf,

    /// Process command line; NUL separators between arguments are kept
    pub cmdline: String,

    /// Path of the executable
    pub exe: String,

    /// Working directory of the process
    pub pwd: String,

    pub mode: CollectionMode,

    /// `None` for traces written with the legacy header
    pub arch: Option<Arch>,

    /// Bucket count `B`
    pub buckets: u32,

    /// Bucket width in nanoseconds
    pub interval: u32,

    /// Symbol id -> counts, ordered by id
    pub symbols: BTreeMap<u64, SymbolSeries>,
}

impl TraceRecord {
    pub fn new(
        cmdline: impl Into<String>,
        mode: CollectionMode,
        arch: Option<Arch>,
        buckets: u32,
        interval: u32,
    ) -> Self {
        Self {
            source_path: PathBuf::new(),
            cmdline: cmdline.into(),
            exe: String::new(),
            pwd: String::new(),
            mode,
            arch,
            buckets,
            interval,
            symbols: BTreeMap::new(),
        }
    }

    /// Add a raw count vector for a symbol and derive its sparse histogram
    ///
    /// Returns `false` if the symbol was already present (the series is replaced).
    pub fn insert_counts(&mut self, symbol_id: u64, counts: Vec<i64>) -> bool {
        let series = SymbolSeries::from_counts(counts, self.interval);
        self.symbols.insert(symbol_id, series).is_none()
    }

    pub fn series(&self, symbol_id: u64) -> Option<&SymbolSeries> {
        self.symbols.get(&symbol_id)
    }

    /// Human-readable name for logs (file path, or the command line)
    pub fn display_name(&self) -> String {
        if self.source_path.as_os_str().is_empty() {
            self.cmdline.replace('\0', " ").trim().to_string()
        } else {
            self.source_path.display().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_uses_bucket_position() {
        let series = SymbolSeries::from_counts(vec![0, 3, 0, 2], 5000);
        let expected: Histogram = [(5000, 3), (15000, 2)].into_iter().collect();
        assert_eq!(series.histogram, expected);
        assert_eq!(series.populated_buckets(), 2);
        assert_eq!(series.total_count(), 5);
    }

    #[test]
    fn test_histogram_skips_non_positive() {
        let series = SymbolSeries::from_counts(vec![-1, 0, 0], 10);
        assert!(series.histogram.is_empty());
    }

    #[test]
    fn test_mode_and_arch_bytes() {
        assert_eq!(CollectionMode::try_from(4), Ok(CollectionMode::BasicBlockTime));
        assert_eq!(CollectionMode::try_from(9), Err(9));
        assert_eq!(Arch::try_from(1), Ok(Arch::Riscv64));
        assert_eq!(Arch::Riscv64.to_string(), "RISCV64");
    }

    #[test]
    fn test_display_name_falls_back_to_cmdline() {
        let record = TraceRecord::new("./a.out\0-v\0", CollectionMode::WallTime, None, 1, 1);
        assert_eq!(record.display_name(), "./a.out -v");
    }
}
