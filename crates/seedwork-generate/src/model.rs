use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use seedwork_core::Batch;

/// Timing and output size of one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub rows: u64,
    pub duration_ms: u64,
}

/// Summary of a generated table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows: u64,
    /// SHA-256 over the rendered rows, in column order.
    pub sha256: String,
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub format_version: String,
    pub seed: u64,
    pub reference_time: NaiveDateTime,
    pub stages: Vec<StageReport>,
    pub tables: Vec<TableReport>,
    pub retries_total: u64,
    pub retries_by_entity: BTreeMap<String, u64>,
    pub dropped_dependency_edges: u64,
    pub downgraded_completions: u64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64, reference_time: NaiveDateTime) -> Self {
        Self {
            run_id,
            format_version: seedwork_core::FORMAT_VERSION.to_string(),
            seed,
            reference_time,
            stages: Vec::new(),
            tables: Vec::new(),
            retries_total: 0,
            retries_by_entity: BTreeMap::new(),
            dropped_dependency_edges: 0,
            downgraded_completions: 0,
            duration_ms: 0,
            failure: None,
        }
    }

    pub fn record_retry(&mut self, entity: &str) {
        self.retries_total += 1;
        *self.retries_by_entity.entry(entity.to_string()).or_insert(0) += 1;
    }

    pub fn record_dropped_edge(&mut self) {
        self.dropped_dependency_edges += 1;
    }

    /// A task rolled as completed but created at `now`, so it stays open.
    pub fn record_downgraded_completion(&mut self) {
        self.downgraded_completions += 1;
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|table| table.table == name)
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub batch: Batch,
    pub report: GenerationReport,
}
