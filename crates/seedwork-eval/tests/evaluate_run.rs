use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use seedwork_core::{Batch, GenerationConfig};
use seedwork_eval::{
    EvalError, EvaluateOptions, EvaluationEngine, ViolationKind, load_batch, validate_batch,
};
use seedwork_generate::{CsvSink, CuratedContent, GenerationEngine, GenerationOutcome, MemorySink};

fn reference_time() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-06-30 12:00:00", "%Y-%m-%d %H:%M:%S")
        .expect("reference time")
}

fn scenario_config() -> GenerationConfig {
    GenerationConfig {
        organizations: 2,
        users: 50,
        history_months: 2,
        tasks_per_user: 5,
        dependency_rate: 0.2,
        seed: Some(42),
        reference_time: Some(reference_time()),
        ..GenerationConfig::default()
    }
}

fn temp_run_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "seedwork_eval_{label}__run_{}",
        uuid::Uuid::new_v4()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn generate_run(run_dir: &Path) -> GenerationOutcome {
    let content = CuratedContent::builtin().expect("builtin content");
    let engine = GenerationEngine::new(scenario_config(), &content).expect("valid config");
    let mut sink = CsvSink::create(&run_dir.join("data")).expect("create sink");
    let outcome = engine.run(&mut sink).expect("run generation");
    fs::write(
        run_dir.join("generation_report.json"),
        serde_json::to_vec_pretty(&outcome.report).expect("serialize report"),
    )
    .expect("write report");
    outcome
}

fn generate_batch() -> Batch {
    let content = CuratedContent::builtin().expect("builtin content");
    let engine = GenerationEngine::new(scenario_config(), &content).expect("valid config");
    engine.run(&mut MemorySink::new()).expect("run generation").batch
}

#[test]
fn generated_scenario_has_no_errors() {
    let batch = generate_batch();
    let validator = validate_batch(&batch, reference_time());
    assert!(validator.errors().is_empty(), "{:?}", validator.errors());
    assert!(validator.warnings().is_empty(), "{:?}", validator.warnings());
}

#[test]
fn csv_output_loads_back_into_the_same_batch() {
    let run_dir = temp_run_dir("roundtrip");
    let outcome = generate_run(&run_dir);
    let loaded = load_batch(&run_dir.join("data")).expect("load batch");
    assert_eq!(
        loaded,
        Batch {
            now: None,
            ..outcome.batch
        }
    );
}

#[test]
fn run_writes_validation_and_report() {
    let run_dir = temp_run_dir("artifacts");
    let outcome = generate_run(&run_dir);

    let engine = EvaluationEngine::new(EvaluateOptions {
        strict: true,
        ..EvaluateOptions::default()
    });
    let result = engine.run(&run_dir).expect("evaluate run");

    assert!(result.summary.passed);
    assert!(result.validation_path.exists());
    assert!(result.report_path.exists());
    assert!(result.report.contains(&outcome.report.run_id));
    assert!(result.report.contains("- result: PASS"));
    assert_eq!(result.metrics.tasks, 250);
    assert_eq!(result.metrics.row_counts.get("tasks"), Some(&250));
    assert!(result.metrics.archived_project_rate > 0.0);
    assert!(result.report.contains("- archived projects: "));
}

#[test]
fn broken_batch_reports_each_violation_class() {
    let mut batch = generate_batch();
    let now = reference_time();

    let task = &mut batch.tasks[0];
    task.completed_at = Some(task.created_at);
    task.is_completed = true;
    batch.users[0].last_active_at = now + chrono::Duration::days(1);
    batch.teams[0].department_id = "missing".to_string();
    batch.departments[0].user_percentage += 0.5;
    batch.tasks[0].organization_id = "missing-org".to_string();
    batch.projects[0].organization_id = "missing-org".to_string();
    let task_id = batch.tasks[0].id.clone();
    let project_id = batch.projects[0].id.clone();

    let validator = validate_batch(&batch, now);
    let kinds: Vec<ViolationKind> = validator
        .errors()
        .iter()
        .map(|violation| violation.kind)
        .collect();
    assert!(kinds.contains(&ViolationKind::StrictOrder));
    assert!(kinds.contains(&ViolationKind::NotInFuture));
    assert!(kinds.contains(&ViolationKind::ForeignKey));
    assert!(kinds.contains(&ViolationKind::PercentageSum));

    for (entity, id, parent) in [("task", &task_id, "project"), ("project", &project_id, "team")] {
        let messages: Vec<&str> = validator
            .errors()
            .iter()
            .filter(|violation| {
                violation.kind == ViolationKind::ForeignKey
                    && violation.entity == entity
                    && &violation.id == id
            })
            .map(|violation| violation.message.as_str())
            .collect();
        assert!(
            messages
                .iter()
                .any(|message| message.contains("organization_id references missing record 'missing-org'")),
            "{entity}: {messages:?}"
        );
        assert!(
            messages
                .iter()
                .any(|message| message.contains(&format!("differs from {parent}.organization_id"))),
            "{entity}: {messages:?}"
        );
    }
}

#[test]
fn cycles_and_self_loops_are_errors() {
    let mut batch = generate_batch();
    let first = batch.tasks[0].id.clone();
    let second = batch.tasks[1].id.clone();
    let created_at = batch.tasks[0].created_at.max(batch.tasks[1].created_at);
    batch.task_dependencies = vec![
        seedwork_core::TaskDependency {
            id: "d1".to_string(),
            blocking_task_id: first.clone(),
            blocked_task_id: second.clone(),
            created_at,
        },
        seedwork_core::TaskDependency {
            id: "d2".to_string(),
            blocking_task_id: second,
            blocked_task_id: first.clone(),
            created_at,
        },
        seedwork_core::TaskDependency {
            id: "d3".to_string(),
            blocking_task_id: first.clone(),
            blocked_task_id: first,
            created_at,
        },
    ];

    let validator = validate_batch(&batch, reference_time());
    let kinds: Vec<ViolationKind> = validator
        .errors()
        .iter()
        .map(|violation| violation.kind)
        .collect();
    assert!(kinds.contains(&ViolationKind::Cycle));
    assert!(kinds.contains(&ViolationKind::SelfReference));
}

#[test]
fn strict_mode_fails_on_errors() {
    let run_dir = temp_run_dir("strict");
    generate_run(&run_dir);

    let users = run_dir.join("data").join("users.csv");
    let mut reader = csv::Reader::from_path(&users).expect("open users");
    let headers = reader.headers().expect("headers").clone();
    let org_column = headers
        .iter()
        .position(|name| name == "organization_id")
        .expect("organization_id column");
    let mut rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .expect("read users");
    drop(reader);
    rows[0] = rows[0]
        .iter()
        .enumerate()
        .map(|(index, value)| if index == org_column { "missing-org" } else { value })
        .collect();

    let mut writer = csv::Writer::from_path(&users).expect("rewrite users");
    writer.write_record(&headers).expect("write header");
    for row in &rows {
        writer.write_record(row).expect("write row");
    }
    writer.flush().expect("flush users");

    let engine = EvaluationEngine::new(EvaluateOptions {
        strict: true,
        ..EvaluateOptions::default()
    });
    match engine.run(&run_dir) {
        Err(EvalError::Violations(count)) => assert!(count >= 1),
        other => panic!("expected violations, got {other:?}"),
    }
    assert!(run_dir.join("validation.json").exists());
}

#[test]
fn missing_table_is_reported() {
    let run_dir = temp_run_dir("missing");
    generate_run(&run_dir);
    fs::remove_file(run_dir.join("data").join("sections.csv")).expect("remove sections");

    let engine = EvaluationEngine::new(EvaluateOptions::default());
    assert!(matches!(engine.run(&run_dir), Err(EvalError::MissingTable(_))));
}
