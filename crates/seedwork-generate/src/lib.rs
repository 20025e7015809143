//! Relational workspace data generation for seedwork.
//!
//! The engine walks the stage pipeline (organizations through task
//! dependencies), sampling every timestamp inside the window its parents
//! allow, and streams each finished table into a [`StorageSink`].

pub mod content;
pub mod engine;
pub mod errors;
pub mod model;
pub mod output;
pub mod sampler;
pub mod sink;
pub mod stages;
pub mod temporal;

pub use content::{ContentProvider, CuratedContent};
pub use engine::{GenerationEngine, fingerprint};
pub use errors::GenerationError;
pub use model::{GenerationOutcome, GenerationReport, StageReport, TableReport};
pub use output::csv::{CsvSink, CsvTableOutput};
pub use sink::{MemorySink, StorageSink};
