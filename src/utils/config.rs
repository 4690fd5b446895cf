//! Configuration and constants for the analysis pipeline.

use crate::utils::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Default regression gate for the weighted-time ratio
pub const DEFAULT_BAD_THRESHOLD: f64 = 0.8;

/// Default bucket width (ns) when rebuilding sampled traces
pub const DEFAULT_SAMPLING_INTERVAL_NS: u32 = 5000;

/// Functions with fewer populated buckets than this are not compared
pub const DEFAULT_MIN_POPULATED_BUCKETS: usize = 2;

/// Path prefix of sources inside the package build environment
pub const DEFAULT_SOURCE_PREFIX: &str = "/home/abuild/rpmbuild/BUILD/";

// Binary trace layout
pub const STRING_TERMINATOR: u8 = 0x03;
pub const TRACE_FILE_PREFIX: &str = "trec_perf_";

// Sampled stacks
pub const UNKNOWN_SYMBOL: &str = "unknown";
pub const CMDLINE_MARKER: &str = "# cmdline :";

/// File name of the debug-info store for a module
pub fn debuginfo_file_name(module_id: u16) -> String {
    format!("debuginfo{}.db", module_id)
}

/// Which comparison drives the acceptable/regressed verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompareMethod {
    /// Weighted-time-integral ratio against the threshold
    #[default]
    WeightedTime,
    /// Kolmogorov-Smirnov shape comparison
    Distribution,
}

impl std::str::FromStr for CompareMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weighted-time" | "time" => Ok(CompareMethod::WeightedTime),
            "distribution" | "ks" => Ok(CompareMethod::Distribution),
            other => Err(ConfigError::Invalid(format!(
                "unknown compare method '{}'",
                other
            ))),
        }
    }
}

/// Complete analysis configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub compare: CompareConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,
}

/// Comparator settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Ratio at or above which a function counts as regressed
    pub threshold: f64,

    /// Verdict-driving comparison
    pub method: CompareMethod,

    /// Minimum number of non-zero buckets a histogram needs to be compared
    pub min_populated_buckets: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BAD_THRESHOLD,
            method: CompareMethod::default(),
            min_populated_buckets: DEFAULT_MIN_POPULATED_BUCKETS,
        }
    }
}

/// Source file resolution for report hints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub prefix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_SOURCE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_ns: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ns: DEFAULT_SAMPLING_INTERVAL_NS,
        }
    }
}

impl AnalysisConfig {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.compare.threshold.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "threshold must be finite, got {}",
                self.compare.threshold
            )));
        }
        if self.sampling.interval_ns == 0 {
            return Err(ConfigError::Invalid(
                "sampling.interval_ns must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load an analysis configuration from a TOML file
///
/// # Errors
/// * `ConfigError::Io` - If file cannot be read
/// * `ConfigError::Parse` - If TOML is invalid
/// * `ConfigError::Invalid` - If a value is out of range
pub fn load_config(path: impl AsRef<Path>) -> Result<AnalysisConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: AnalysisConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.compare.threshold, 0.8);
        assert_eq!(config.compare.method, CompareMethod::WeightedTime);
        assert_eq!(config.compare.min_populated_buckets, 2);
        assert_eq!(config.sampling.interval_ns, 5000);
    }

    #[test]
    fn test_partial_toml() {
        let config: AnalysisConfig = toml::from_str(
            r#"
            [compare]
            threshold = 0.5
            method = "distribution"
            "#,
        )
        .unwrap();
        assert_eq!(config.compare.threshold, 0.5);
        assert_eq!(config.compare.method, CompareMethod::Distribution);
        assert_eq!(config.compare.min_populated_buckets, 2);
        assert_eq!(config.source.prefix, DEFAULT_SOURCE_PREFIX);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = AnalysisConfig::default();
        config.sampling.interval_ns = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("ks".parse::<CompareMethod>().unwrap(), CompareMethod::Distribution);
        assert!("bogus".parse::<CompareMethod>().is_err());
    }
}
