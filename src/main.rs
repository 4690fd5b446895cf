//! xarch-perf CLI
//!
//! Cross-architecture performance triage. Compares per-function
//! execution-time histograms of the same programs run on different
//! architectures and flags what got slower.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use xarch_perf::commands::{
    display_version, execute_aggregate, execute_compare, execute_conformity, execute_dump,
    execute_sampled, execute_score, AggregateArgs, CompareArgs, ConfigOverrides, ConformityArgs,
    DumpArgs, SampledArgs, ScoreArgs,
};
use xarch_perf::utils::config::CompareMethod;

/// xarch-perf - Cross-architecture performance triage
#[derive(Parser, Debug)]
#[command(name = "xarch-perf")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Configuration flags shared by the scoring commands
#[derive(Args, Debug)]
struct ConfigFlags {
    /// TOML analysis configuration
    #[arg(short, long, env = "XARCH_PERF_CONFIG")]
    config: Option<PathBuf>,

    /// Bad performance threshold (default: 0.8)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Verdict method: weighted-time or distribution
    #[arg(short, long)]
    method: Option<CompareMethod>,

    /// Path prefix inside the build environment
    #[arg(short, long)]
    prefix: Option<String>,

    /// Minimum number of populated buckets to compare a function
    #[arg(long)]
    min_populated: Option<usize>,
}

impl ConfigFlags {
    fn into_overrides(self, interval_ns: Option<u32>) -> ConfigOverrides {
        ConfigOverrides {
            config: self.config,
            threshold: self.threshold,
            method: self.method,
            prefix: self.prefix,
            min_populated_buckets: self.min_populated,
            interval_ns,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Triage functions of two instrumented runs
    Compare {
        /// Directory of perf data and debuginfo from the 1st architecture
        dir_a: PathBuf,

        /// Directory of perf data and debuginfo from the 2nd architecture
        dir_b: PathBuf,

        /// Trace subdirectory (default: perf_data)
        #[arg(long)]
        data_dir: Option<String>,

        #[command(flatten)]
        config: ConfigFlags,

        /// Output path for the JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not print the terminal summary
        #[arg(long)]
        quiet: bool,

        /// Exit with an error when anything regressed
        #[arg(long)]
        fail_on_regression: bool,
    },

    /// Triage basic blocks of two block-mode runs
    Blocks {
        dir_a: PathBuf,
        dir_b: PathBuf,

        /// Trace subdirectory of the 1st architecture (default: perf_data_bbl_0)
        #[arg(long)]
        data_dir_a: Option<String>,

        /// Trace subdirectory of the 2nd architecture (default: perf_data_bbl_1)
        #[arg(long)]
        data_dir_b: Option<String>,

        #[command(flatten)]
        config: ConfigFlags,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        quiet: bool,

        #[arg(long)]
        fail_on_regression: bool,
    },

    /// Export pairwise CDF / KL / time-difference scores as CSV
    Score {
        dir_a: PathBuf,
        dir_b: PathBuf,

        #[arg(long, default_value = "perf_data")]
        data_dir: String,

        /// Directory to store the CSV files
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Aggregate scores of one testcase set run several times
    Aggregate {
        /// Directories of perf data and debuginfo, one per run
        #[arg(required = true, num_args = 2..)]
        dirs: Vec<PathBuf>,

        #[arg(long, default_value = "perf_data")]
        data_dir: String,

        /// Directory to store the CSV files
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Triage functions rebuilt from perf-exported sample databases
    Sampled {
        dir_a: PathBuf,
        dir_b: PathBuf,

        #[command(flatten)]
        config: ConfigFlags,

        /// Bucket width in nanoseconds (default: 5000)
        #[arg(long)]
        interval: Option<u32>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the rebuilt traces to this directory
        #[arg(long)]
        export: Option<PathBuf>,

        #[arg(long)]
        quiet: bool,

        #[arg(long)]
        fail_on_regression: bool,
    },

    /// Rank caller/callee edges that diverge between two sampled runs
    Conformity {
        dir_a: PathBuf,
        dir_b: PathBuf,

        /// Edges kept per testcase
        #[arg(long, default_value = "10")]
        per_testcase: usize,

        /// Edges reported overall
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,

        #[arg(long)]
        interval: Option<u32>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the header and per-symbol totals of one trace file
    Dump {
        /// Path to trace file
        trace: PathBuf,

        /// Path to debuginfo dir
        #[arg(short, long)]
        debuginfo: Option<PathBuf>,

        /// Only print the symbols with the largest totals
        #[arg(long)]
        top: Option<usize>,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Compare {
            dir_a,
            dir_b,
            data_dir,
            config,
            output,
            quiet,
            fail_on_regression,
        } => {
            let defaults = CompareArgs::default();
            execute_compare(CompareArgs {
                dir_a,
                dir_b,
                data_dir_a: data_dir.clone().unwrap_or(defaults.data_dir_a),
                data_dir_b: data_dir.unwrap_or(defaults.data_dir_b),
                overrides: config.into_overrides(None),
                output,
                summary: !quiet,
                fail_on_regression,
                ..CompareArgs::default()
            })?;
        }

        Commands::Blocks {
            dir_a,
            dir_b,
            data_dir_a,
            data_dir_b,
            config,
            output,
            quiet,
            fail_on_regression,
        } => {
            let defaults = CompareArgs::blocks();
            execute_compare(CompareArgs {
                dir_a,
                dir_b,
                data_dir_a: data_dir_a.unwrap_or(defaults.data_dir_a),
                data_dir_b: data_dir_b.unwrap_or(defaults.data_dir_b),
                overrides: config.into_overrides(None),
                output,
                summary: !quiet,
                fail_on_regression,
                granularity: defaults.granularity,
            })?;
        }

        Commands::Score {
            dir_a,
            dir_b,
            data_dir,
            output,
        } => {
            execute_score(ScoreArgs {
                dir_a,
                dir_b,
                data_dir,
                output_dir: output,
            })?;
        }

        Commands::Aggregate {
            dirs,
            data_dir,
            output,
        } => {
            execute_aggregate(AggregateArgs {
                dirs,
                data_dir,
                output_dir: output,
            })?;
        }

        Commands::Sampled {
            dir_a,
            dir_b,
            config,
            interval,
            output,
            export,
            quiet,
            fail_on_regression,
        } => {
            execute_sampled(SampledArgs {
                dir_a,
                dir_b,
                overrides: config.into_overrides(interval),
                output,
                export_dir: export,
                summary: !quiet,
                fail_on_regression,
            })?;
        }

        Commands::Conformity {
            dir_a,
            dir_b,
            per_testcase,
            top,
            interval,
            output,
        } => {
            execute_conformity(ConformityArgs {
                dir_a,
                dir_b,
                overrides: ConfigOverrides {
                    interval_ns: interval,
                    ..ConfigOverrides::default()
                },
                per_testcase,
                top_n: top,
                output,
            })?;
        }

        Commands::Dump {
            trace,
            debuginfo,
            top,
        } => {
            execute_dump(DumpArgs {
                trace,
                debuginfo,
                top,
            })?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
