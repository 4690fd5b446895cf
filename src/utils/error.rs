//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while decoding or reading a trace file
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Malformed trace {path}: {reason}")]
    MalformedTrace { path: String, reason: String },

    #[error("Failed to read trace {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("None of the {attempted} trace files decoded ({failed} malformed or unreadable)")]
    EmptyBatch { attempted: usize, failed: usize },
}

impl TraceError {
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        TraceError::MalformedTrace {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while rebuilding activity from sampled call stacks
#[derive(Error, Debug)]
pub enum CallGraphError {
    #[error("Sample {sample_id} references call path {call_path_id} which is not in the call-path table")]
    BrokenCallPath { sample_id: u64, call_path_id: u64 },

    #[error("Symbol {symbol_id} is not in the symbol table")]
    MissingSymbol { symbol_id: u64 },

    #[error("Symbol {symbol_id} left the call chain at {timestamp}ns without a recorded enter time")]
    UnbalancedActivation { symbol_id: u64, timestamp: u64 },

    #[error("Sample {sample_id} at {timestamp}ns precedes the previous sample at {previous}ns")]
    OutOfOrderSample {
        sample_id: u64,
        timestamp: u64,
        previous: u64,
    },

    #[error("Activation of {start}ns does not fit a trace with {interval}ns buckets")]
    BucketOverflow { start: u64, interval: u32 },

    #[error("No '# cmdline' header found for sample database {0}")]
    MissingCommandLine(String),

    #[error("Sample database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the symbol/line lookup capability
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("No debug-info store for module {module_id} (expected {path})")]
    MissingStore { module_id: u16, path: String },

    #[error("No {table} entry with id {id} in module {module_id}")]
    MissingEntry {
        table: &'static str,
        module_id: u16,
        id: u64,
    },

    #[error("Lookup not supported by this store: {0}")]
    Unsupported(&'static str),

    #[error("Debug-info database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while pairing testcases and symbols across runs
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Matching invariant broken for command line {command_line:?}: expected {expected} traces, found {found}")]
    MatchingInvariantBroken {
        command_line: String,
        expected: usize,
        found: usize,
    },

    #[error("Incomplete match group for {symbol}: expected {expected} data points, found {found}")]
    IncompleteMatchGroup {
        symbol: String,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Conditions reported by individual scorers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("Baseline weighted time is {baseline_time}, ratio is undefined")]
    DegenerateBaseline { baseline_time: f64 },
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that can occur while loading the analysis configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
