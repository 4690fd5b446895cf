//! Schema definitions for comparison results and triage reports.

use super::ks::KsOutcome;
use crate::lookup::LineRange;
use crate::utils::config::CompareMethod;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Serialize/deserialize score values. JSON has no literal for infinite or
/// NaN numbers, so those are written as the strings `"inf"`, `"-inf"` and
/// `"nan"`; finite values stay plain numbers.
mod score_float {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    fn from_repr<E: serde::de::Error>(repr: Repr) -> Result<f64, E> {
        match repr {
            Repr::Number(v) => Ok(v),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(E::custom(format!("invalid score value '{}'", other))),
            },
        }
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        from_repr(Repr::deserialize(deserializer)?)
    }

    pub mod option {
        use super::Repr;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
            Option::<Repr>::deserialize(deserializer)?
                .map(super::from_repr)
                .transpose()
        }
    }
}

/// Acceptable/regressed classification of one match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Acceptable,
    Regressed,
}

/// Where in the sources a result comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceHint {
    /// Source file with the build prefix removed
    pub file: Option<String>,

    /// Declaration line encoded in the function name
    pub line: Option<u32>,

    /// Covered lines, for block results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<LineRange>,
}

/// Every score computed for a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// Weighted-time ratio; `None` when the baseline integrates to zero
    #[serde(with = "score_float::option")]
    pub ratio: Option<f64>,

    pub ks: KsOutcome,

    #[serde(with = "score_float")]
    pub cdf: f64,

    /// Infinite when side `a` has counts where side `b` has none
    #[serde(with = "score_float")]
    pub kl_divergence: f64,

    #[serde(with = "score_float")]
    pub diff_time: f64,
}

/// One matched function or block with its scores and verdict
///
/// Count vectors borrow from the decoded traces for the duration of a
/// comparison pass and are owned once a report is read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult<'a> {
    /// Resolved function name (owning function for blocks)
    pub name: String,

    /// Testcase the match belongs to
    pub testcase: String,

    pub id_a: u64,
    pub id_b: u64,

    pub counts_a: Cow<'a, [i64]>,
    pub counts_b: Cow<'a, [i64]>,

    pub interval_a: u32,
    pub interval_b: u32,

    pub scores: Scores,

    pub verdict: Verdict,

    /// Ratio undefined because side `a` integrates to zero
    #[serde(default)]
    pub degenerate_baseline: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hint: Option<SourceHint>,
}

impl ComparisonResult<'_> {
    /// Detach from the traces the counts were borrowed from
    pub fn into_owned(self) -> ComparisonResult<'static> {
        ComparisonResult {
            counts_a: Cow::Owned(self.counts_a.into_owned()),
            counts_b: Cow::Owned(self.counts_b.into_owned()),
            name: self.name,
            testcase: self.testcase,
            id_a: self.id_a,
            id_b: self.id_b,
            interval_a: self.interval_a,
            interval_b: self.interval_b,
            scores: self.scores,
            verdict: self.verdict,
            degenerate_baseline: self.degenerate_baseline,
            source_hint: self.source_hint,
        }
    }
}

/// Triage of every comparison of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageReport<'a> {
    /// Schema version of the report format
    pub version: String,

    /// ISO 8601 timestamp
    pub generated_at: String,

    pub method: CompareMethod,

    pub threshold: f64,

    /// Matched testcases that were compared
    pub testcases: usize,

    /// Sorted by ratio, largest first
    pub regressed: Vec<ComparisonResult<'a>>,

    pub acceptable: Vec<ComparisonResult<'a>>,

    /// Results whose baseline integrates to zero
    pub degenerate: Vec<ComparisonResult<'a>>,

    pub summary: TriageSummary,
}

/// Counts shown in the status line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageSummary {
    pub compared: usize,
    pub regressed: usize,
    pub acceptable: usize,
    pub degenerate: usize,
}
