use std::path::PathBuf;

use thiserror::Error;

/// Errors emitted while loading or validating a batch.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("missing table file {}", .0.display())]
    MissingTable(PathBuf),
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
    #[error("validation failed with {0} error(s)")]
    Violations(u64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
