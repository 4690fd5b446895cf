use crate::utils::config::CompareMethod;
use std::path::PathBuf;

/// Default subdirectory holding `trec_perf_*` files
pub const DEFAULT_DATA_DIR: &str = "perf_data";

/// Block traces of the first and second architecture
pub const DEFAULT_BLOCK_DATA_DIRS: [&str; 2] = ["perf_data_bbl_0", "perf_data_bbl_1"];

/// Subdirectory holding `debuginfo{N}.db` stores
pub const DEBUGINFO_DIR: &str = "debuginfo";

/// Command-line overrides applied on top of the configuration file
///
/// **Public** - shared by every command that scores anything
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// TOML configuration file
    pub config: Option<PathBuf>,

    pub threshold: Option<f64>,

    pub method: Option<CompareMethod>,

    /// Build-environment prefix stripped from source file names
    pub prefix: Option<String>,

    pub min_populated_buckets: Option<usize>,

    /// Bucket width for rebuilt sampled traces
    pub interval_ns: Option<u32>,
}

/// Which symbols a triage run compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Functions,
    Blocks,
}

/// Arguments for the compare and blocks commands
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct CompareArgs {
    /// Data directory of the first architecture
    pub dir_a: PathBuf,

    /// Data directory of the second architecture
    pub dir_b: PathBuf,

    /// Trace subdirectory inside `dir_a`
    pub data_dir_a: String,

    /// Trace subdirectory inside `dir_b`
    pub data_dir_b: String,

    pub granularity: Granularity,

    pub overrides: ConfigOverrides,

    /// Output path for the JSON triage report
    pub output: Option<PathBuf>,

    /// Print terminal summary
    pub summary: bool,

    /// Return an error when anything regressed
    pub fail_on_regression: bool,
}

impl Default for CompareArgs {
    fn default() -> Self {
        Self {
            dir_a: PathBuf::new(),
            dir_b: PathBuf::new(),
            data_dir_a: DEFAULT_DATA_DIR.to_string(),
            data_dir_b: DEFAULT_DATA_DIR.to_string(),
            granularity: Granularity::Functions,
            overrides: ConfigOverrides::default(),
            output: None,
            summary: true,
            fail_on_regression: false,
        }
    }
}

impl CompareArgs {
    /// Defaults for block-level triage
    pub fn blocks() -> Self {
        Self {
            data_dir_a: DEFAULT_BLOCK_DATA_DIRS[0].to_string(),
            data_dir_b: DEFAULT_BLOCK_DATA_DIRS[1].to_string(),
            granularity: Granularity::Blocks,
            ..Self::default()
        }
    }
}

/// Arguments for the pairwise score export
#[derive(Debug, Clone)]
pub struct ScoreArgs {
    pub dir_a: PathBuf,
    pub dir_b: PathBuf,
    pub data_dir: String,

    /// Directory receiving `{i}.csv`
    pub output_dir: PathBuf,
}

impl Default for ScoreArgs {
    fn default() -> Self {
        Self {
            dir_a: PathBuf::new(),
            dir_b: PathBuf::new(),
            data_dir: DEFAULT_DATA_DIR.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Arguments for the N-way aggregation export
#[derive(Debug, Clone)]
pub struct AggregateArgs {
    /// One data directory per run
    pub dirs: Vec<PathBuf>,
    pub data_dir: String,

    /// Directory receiving `{i}.csv` and `total.csv`
    pub output_dir: PathBuf,
}

impl Default for AggregateArgs {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            data_dir: DEFAULT_DATA_DIR.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Arguments for triage of sampled traces
#[derive(Debug, Clone, Default)]
pub struct SampledArgs {
    pub dir_a: PathBuf,
    pub dir_b: PathBuf,
    pub overrides: ConfigOverrides,

    /// Output path for the JSON triage report
    pub output: Option<PathBuf>,

    /// Also write the rebuilt traces as `trec_perf_*` files here
    pub export_dir: Option<PathBuf>,

    pub summary: bool,

    pub fail_on_regression: bool,
}

/// Arguments for the caller/callee conformity check
#[derive(Debug, Clone)]
pub struct ConformityArgs {
    pub dir_a: PathBuf,
    pub dir_b: PathBuf,
    pub overrides: ConfigOverrides,

    /// Edges kept per testcase before summing
    pub per_testcase: usize,

    /// Edges reported overall
    pub top_n: usize,

    /// Output path for the JSON edge ranking
    pub output: Option<PathBuf>,
}

impl Default for ConformityArgs {
    fn default() -> Self {
        Self {
            dir_a: PathBuf::new(),
            dir_b: PathBuf::new(),
            overrides: ConfigOverrides::default(),
            per_testcase: 10,
            top_n: 10,
            output: None,
        }
    }
}

/// Arguments for the dump command
#[derive(Debug, Clone, Default)]
pub struct DumpArgs {
    /// Trace file to print
    pub trace: PathBuf,

    /// Debug-info directory used to name symbols
    pub debuginfo: Option<PathBuf>,

    /// Only print this many symbols, largest totals first
    pub top: Option<usize>,
}
