use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("inverted interval: {lower} is after {upper}")]
    Range {
        lower: NaiveDateTime,
        upper: NaiveDateTime,
    },
    #[error("candidate pool '{pool}' is empty and no fallback was supplied")]
    EmptyPool { pool: String },
    #[error("content category '{category}' is missing or empty")]
    EmptySource { category: String },
    #[error("{entity} {id} failed its self-check: {message}")]
    ConstraintViolation {
        entity: &'static str,
        id: String,
        message: String,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] seedwork_core::Error),
    #[error("invalid content: {0}")]
    Content(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
