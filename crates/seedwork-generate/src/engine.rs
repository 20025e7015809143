use std::collections::BTreeSet;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use seedwork_core::{Batch, GenerationConfig, Record, Stage, ToRecord, stage_order, to_records};

use crate::content::ContentProvider;
use crate::errors::GenerationError;
use crate::model::{GenerationOutcome, GenerationReport, StageReport, TableReport};
use crate::sink::StorageSink;
use crate::stages::{
    StageContext, TimeAnchors, dependencies, departments, memberships, organizations, projects,
    tasks, teams, users,
};

/// Runs the stage pipeline and hands every finished collection to a sink.
pub struct GenerationEngine<'c> {
    config: GenerationConfig,
    content: &'c dyn ContentProvider,
    run_id: Option<String>,
}

impl<'c> GenerationEngine<'c> {
    /// Validates `config` up front; nothing is generated from a bad config.
    pub fn new(
        config: GenerationConfig,
        content: &'c dyn ContentProvider,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        Ok(Self {
            config,
            content,
            run_id: None,
        })
    }

    /// Use a caller-chosen run id instead of a fresh UUID.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate one batch. On success the sink is committed; on any error it
    /// is aborted and the error returned.
    pub fn run(&self, sink: &mut dyn StorageSink) -> Result<GenerationOutcome, GenerationError> {
        let (report, outcome) = self.run_with_report(sink);
        outcome.map(|batch| GenerationOutcome { batch, report })
    }

    /// Like [`run`](Self::run), but the report comes back even when the run
    /// fails; its `failure` then holds the error message.
    pub fn run_with_report(
        &self,
        sink: &mut dyn StorageSink,
    ) -> (GenerationReport, Result<Batch, GenerationError>) {
        let start = Instant::now();
        let run_id = self
            .run_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let now = self.config.resolve_reference_time();
        let mut report = GenerationReport::new(run_id.clone(), seed, now);

        info!(
            run_id = %run_id,
            seed,
            reference_time = %now,
            organizations = self.config.organizations,
            users = self.config.users,
            tasks = self.config.total_tasks(),
            "generation started"
        );

        let outcome = TimeAnchors::new(now, self.config.history_months)
            .and_then(|anchors| self.run_stages(seed, anchors, &mut report, sink))
            .and_then(|batch| {
                sink.commit()?;
                Ok(batch)
            });
        report.duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => {
                info!(
                    run_id = %run_id,
                    tables = report.tables.len(),
                    retries = report.retries_total,
                    dropped_edges = report.dropped_dependency_edges,
                    duration_ms = report.duration_ms,
                    "generation completed"
                );
            }
            Err(err) => {
                if let Err(abort_err) = sink.abort() {
                    warn!(run_id = %run_id, error = %abort_err, "sink abort failed");
                }
                warn!(run_id = %run_id, error = %err, "generation failed");
                report.failure = Some(err.to_string());
            }
        }
        (report, outcome)
    }

    fn run_stages(
        &self,
        seed: u64,
        anchors: TimeAnchors,
        report: &mut GenerationReport,
        sink: &mut dyn StorageSink,
    ) -> Result<Batch, GenerationError> {
        let mut batch = Batch {
            now: Some(anchors.now),
            ..Batch::default()
        };
        let mut finished: BTreeSet<Stage> = BTreeSet::new();

        for stage in stage_order()? {
            if let Some(missing) = stage
                .upstream()
                .iter()
                .find(|upstream| !finished.contains(*upstream))
            {
                return Err(GenerationError::InvalidConfig(seedwork_core::Error::Other(
                    format!("stage '{}' started before '{}'", stage.name(), missing.name()),
                )));
            }

            let stage_start = Instant::now();
            info!(stage = stage.name(), "stage started");
            let rows = self.run_stage(stage, seed, anchors, report, &mut batch)?;
            publish_stage(stage, &batch, report, sink)?;

            let duration_ms = stage_start.elapsed().as_millis() as u64;
            report.stages.push(StageReport {
                stage: stage.name().to_string(),
                rows: rows as u64,
                duration_ms,
            });
            info!(stage = stage.name(), rows, duration_ms, "stage finished");
            finished.insert(stage);
        }

        Ok(batch)
    }

    fn run_stage(
        &self,
        stage: Stage,
        seed: u64,
        anchors: TimeAnchors,
        report: &mut GenerationReport,
        batch: &mut Batch,
    ) -> Result<usize, GenerationError> {
        let mut ctx = StageContext::new(stage, seed, &self.config, self.content, anchors, report);

        let rows = match stage {
            Stage::Organizations => {
                batch.organizations = organizations::generate(&mut ctx)?;
                batch.organizations.len()
            }
            Stage::Departments => {
                batch.departments = departments::generate(&mut ctx, &batch.organizations)?;
                batch.departments.len()
            }
            Stage::Users => {
                batch.users = users::generate(&mut ctx, &batch.organizations, &batch.departments)?;
                batch.users.len()
            }
            Stage::Teams => {
                batch.teams = teams::generate(
                    &mut ctx,
                    &batch.organizations,
                    &batch.departments,
                    &batch.users,
                )?;
                batch.teams.len()
            }
            Stage::TeamMemberships => {
                batch.team_memberships = memberships::generate(&mut ctx, &batch.users, &batch.teams)?;
                batch.team_memberships.len()
            }
            Stage::Projects => {
                let output = projects::generate(&mut ctx, &batch.users, &batch.teams)?;
                batch.projects = output.projects;
                batch.sections = output.sections;
                batch.projects.len()
            }
            Stage::Tasks => {
                let output = tasks::generate(
                    &mut ctx,
                    &batch.users,
                    &batch.team_memberships,
                    &batch.projects,
                    &batch.sections,
                )?;
                batch.tasks = output.tasks;
                batch.task_projects = output.task_projects;
                batch.tasks.len()
            }
            Stage::TaskDependencies => {
                batch.task_dependencies =
                    dependencies::generate(&mut ctx, &batch.tasks, &batch.task_projects)?;
                batch.task_dependencies.len()
            }
        };

        Ok(rows)
    }
}

fn publish_stage(
    stage: Stage,
    batch: &Batch,
    report: &mut GenerationReport,
    sink: &mut dyn StorageSink,
) -> Result<(), GenerationError> {
    match stage {
        Stage::Organizations => publish(&batch.organizations, report, sink),
        Stage::Departments => publish(&batch.departments, report, sink),
        Stage::Users => publish(&batch.users, report, sink),
        Stage::Teams => publish(&batch.teams, report, sink),
        Stage::TeamMemberships => publish(&batch.team_memberships, report, sink),
        Stage::Projects => {
            publish(&batch.projects, report, sink)?;
            publish(&batch.sections, report, sink)
        }
        Stage::Tasks => {
            publish(&batch.tasks, report, sink)?;
            publish(&batch.task_projects, report, sink)
        }
        Stage::TaskDependencies => publish(&batch.task_dependencies, report, sink),
    }
}

fn publish<T: ToRecord>(
    rows: &[T],
    report: &mut GenerationReport,
    sink: &mut dyn StorageSink,
) -> Result<(), GenerationError> {
    let records = to_records(rows);
    report.tables.push(TableReport {
        table: T::TABLE.to_string(),
        rows: records.len() as u64,
        sha256: fingerprint(T::COLUMNS, &records),
    });
    sink.append(T::TABLE, T::COLUMNS, records)
}

/// SHA-256 over the header and every rendered row, tab separated.
pub fn fingerprint(columns: &[&str], records: &[Record]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(columns.join("\t").as_bytes());
    hasher.update(b"\n");
    for record in records {
        let line: Vec<String> = columns
            .iter()
            .map(|column| {
                record
                    .get(column)
                    .map(|value| value.render())
                    .unwrap_or_default()
            })
            .collect();
        hasher.update(line.join("\t").as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
