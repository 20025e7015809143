use thiserror::Error;

/// Core error type shared across seedwork crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The generation config violates its documented bounds.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// The stage dependency list is not a DAG.
    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by seedwork crates.
pub type Result<T> = std::result::Result<T, Error>;
