use std::path::Path;
use std::time::Instant;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use seedwork_core::{Batch, TIMESTAMP_FORMAT};
use seedwork_generate::GenerationReport;

use crate::errors::EvalError;
use crate::loader::load_batch;
use crate::metrics::{DistributionMetrics, collect_metrics};
use crate::model::{EvaluateOptions, EvaluationResult, ValidationSummary};
use crate::report::{RunInfo, render_report};
use crate::validator::validate_batch;

/// Validate batches and report on their distributions.
#[derive(Debug, Clone)]
pub struct EvaluationEngine {
    options: EvaluateOptions,
}

impl EvaluationEngine {
    pub fn new(options: EvaluateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EvaluateOptions {
        &self.options
    }

    /// Validate an in-memory batch without touching the filesystem.
    pub fn evaluate(
        &self,
        batch: &Batch,
        now: NaiveDateTime,
    ) -> (ValidationSummary, DistributionMetrics) {
        let summary = validate_batch(batch, now).summary(self.options.max_examples);
        (summary, collect_metrics(batch))
    }

    /// Load a run directory, validate it and write `validation.json` and
    /// `report.md` next to it (or into `out_dir` when set).
    pub fn run(&self, run_dir: &Path) -> Result<EvaluationResult, EvalError> {
        let start = Instant::now();
        let generation = read_generation_report(run_dir);
        let data_dir = if run_dir.join("data").is_dir() {
            run_dir.join("data")
        } else {
            run_dir.to_path_buf()
        };

        let batch = load_batch(&data_dir)?;
        let now = generation
            .as_ref()
            .map(|report| report.reference_time)
            .or(batch.now)
            .ok_or_else(|| {
                EvalError::InvalidDataset(format!(
                    "no generation_report.json in {}; reference time unknown",
                    run_dir.display()
                ))
            })?;

        let run = RunInfo {
            run_id: generation
                .as_ref()
                .map(|report| report.run_id.clone())
                .or_else(|| detect_run_id(run_dir))
                .unwrap_or_else(|| "unknown".to_string()),
            seed: generation.as_ref().map(|report| report.seed),
            reference_time: now.format(TIMESTAMP_FORMAT).to_string(),
        };

        let (summary, metrics) = self.evaluate(&batch, now);
        let report = render_report(&run, &summary, &metrics);

        let out_dir = self
            .options
            .out_dir
            .clone()
            .unwrap_or_else(|| run_dir.to_path_buf());
        std::fs::create_dir_all(&out_dir)?;

        let validation_path = out_dir.join("validation.json");
        std::fs::write(&validation_path, serde_json::to_vec_pretty(&summary)?)?;

        let report_path = out_dir.join("report.md");
        std::fs::write(&report_path, report.as_bytes())?;

        let duration_ms = start.elapsed().as_millis() as u64;
        if summary.passed {
            info!(
                run_id = %run.run_id,
                warnings = summary.warning_count,
                duration_ms,
                "validation passed"
            );
        } else {
            warn!(
                run_id = %run.run_id,
                errors = summary.error_count,
                warnings = summary.warning_count,
                duration_ms,
                "validation failed"
            );
        }

        if self.options.strict && !summary.passed {
            return Err(EvalError::Violations(summary.error_count));
        }

        Ok(EvaluationResult {
            out_dir,
            validation_path,
            report_path,
            summary,
            metrics,
            report,
        })
    }
}

fn read_generation_report(run_dir: &Path) -> Option<GenerationReport> {
    let contents = std::fs::read_to_string(run_dir.join("generation_report.json")).ok()?;
    serde_json::from_str(&contents).ok()
}

fn detect_run_id(run_dir: &Path) -> Option<String> {
    let name = run_dir.file_name()?.to_string_lossy();
    name.split_once("__run_")
        .map(|(_, run_part)| run_part.to_string())
}
