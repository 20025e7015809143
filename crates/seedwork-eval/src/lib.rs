//! Consistency validation and distribution metrics for generated batches.

pub mod engine;
pub mod errors;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod report;
pub mod validator;

pub use engine::EvaluationEngine;
pub use errors::EvalError;
pub use loader::load_batch;
pub use metrics::{CompletionStats, DistributionMetrics, METRICS_VERSION, collect_metrics};
pub use model::{
    EvaluateOptions, EvaluationResult, Severity, ValidationSummary, Violation, ViolationKind,
};
pub use report::{RunInfo, render_report};
pub use validator::{ConsistencyValidator, validate_batch};
