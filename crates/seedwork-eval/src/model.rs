use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::metrics::DistributionMetrics;

/// Options for batch evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateOptions {
    /// Fail when the batch has validation errors.
    pub strict: bool,
    /// Limit the number of examples kept per severity.
    pub max_examples: usize,
    /// Optional output directory override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_examples: 20,
            out_dir: None,
        }
    }
}

/// Invariant class a violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    TemporalOrder,
    StrictOrder,
    NotInFuture,
    ForeignKey,
    Cardinality,
    SelfReference,
    PercentageSum,
    DateBound,
    DoneBucket,
    Cycle,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::TemporalOrder => "temporal_order",
            ViolationKind::StrictOrder => "strict_order",
            ViolationKind::NotInFuture => "not_in_future",
            ViolationKind::ForeignKey => "foreign_key",
            ViolationKind::Cardinality => "cardinality",
            ViolationKind::SelfReference => "self_reference",
            ViolationKind::PercentageSum => "percentage_sum",
            ViolationKind::DateBound => "date_bound",
            ViolationKind::DoneBucket => "done_bucket",
            ViolationKind::Cycle => "cycle",
        }
    }
}

/// Errors block acceptance; warnings are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Structured violation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub entity: String,
    pub id: String,
    pub message: String,
}

/// Outcome of validating one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub passed: bool,
    pub error_count: u64,
    pub warning_count: u64,
    pub errors_by_kind: BTreeMap<String, u64>,
    pub warnings_by_kind: BTreeMap<String, u64>,
    /// First errors in detection order.
    pub errors: Vec<Violation>,
    /// First warnings in detection order.
    pub warnings: Vec<Violation>,
}

/// Result of evaluating a batch and writing its artifacts.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub out_dir: PathBuf,
    pub validation_path: PathBuf,
    pub report_path: PathBuf,
    pub summary: ValidationSummary,
    pub metrics: DistributionMetrics,
    pub report: String,
}
