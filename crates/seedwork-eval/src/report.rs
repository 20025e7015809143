use crate::metrics::DistributionMetrics;
use crate::model::{ValidationSummary, Violation};

/// Identity of the evaluated run, shown in the report header.
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    pub run_id: String,
    pub seed: Option<u64>,
    pub reference_time: String,
}

/// Render a deterministic markdown report from the summary and metrics.
pub fn render_report(
    run: &RunInfo,
    summary: &ValidationSummary,
    metrics: &DistributionMetrics,
) -> String {
    let mut lines = Vec::new();

    lines.push("# Seedwork Evaluation Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- run_id: {}", run.run_id));
    if let Some(seed) = run.seed {
        lines.push(format!("- seed: {seed}"));
    }
    lines.push(format!("- reference_time: {}", run.reference_time));
    lines.push(format!(
        "- result: {}",
        if summary.passed { "PASS" } else { "FAIL" }
    ));
    lines.push(format!("- errors: {}", summary.error_count));
    lines.push(format!("- warnings: {}", summary.warning_count));
    lines.push(String::new());

    lines.push("## Row counts".to_string());
    lines.push("| table | rows |".to_string());
    lines.push("| --- | --- |".to_string());
    for (table, rows) in &metrics.row_counts {
        lines.push(format!("| {table} | {rows} |"));
    }
    lines.push(String::new());

    lines.push("## Distributions".to_string());
    lines.push(format!("- unassigned tasks: {}", percent(metrics.unassigned_rate)));
    lines.push(format!(
        "- tasks created by managers: {}",
        percent(metrics.manager_created_rate)
    ));
    lines.push(format!(
        "- tasks with a due date: {}",
        percent(metrics.tasks_with_due_date_rate)
    ));
    lines.push(format!("- milestone tasks: {}", percent(metrics.milestone_rate)));
    lines.push(format!(
        "- archived projects: {}",
        percent(metrics.archived_project_rate)
    ));
    lines.push(format!(
        "- weekend task creation: {}",
        percent(metrics.weekend_creation_rate)
    ));
    lines.push(format!(
        "- secondary memberships per user: {:.2}",
        metrics.secondary_membership_rate
    ));
    lines.push(format!(
        "- dependencies per task: {:.3}",
        metrics.dependencies_per_task
    ));
    lines.push(String::new());

    lines.push("| project_type | tasks | completed | rate |".to_string());
    lines.push("| --- | --- | --- | --- |".to_string());
    for (project_type, stats) in &metrics.completion_by_project_type {
        lines.push(format!(
            "| {project_type} | {} | {} | {} |",
            stats.tasks,
            stats.completed,
            percent(stats.rate)
        ));
    }
    lines.push(String::new());

    lines.push("| weekday | tasks created |".to_string());
    lines.push("| --- | --- |".to_string());
    for (day, count) in &metrics.created_by_weekday {
        let label = day.split_once('_').map(|(_, name)| name).unwrap_or(day);
        lines.push(format!("| {label} | {count} |"));
    }
    lines.push(String::new());

    if !summary.errors.is_empty() {
        lines.push("## Top errors".to_string());
        push_violations(&mut lines, &summary.errors);
        lines.push(String::new());
    }

    if !summary.warnings.is_empty() {
        lines.push("## Warnings".to_string());
        push_violations(&mut lines, &summary.warnings);
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(summary));
    lines.join("\n")
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn push_violations(lines: &mut Vec<String>, violations: &[Violation]) {
    for violation in violations {
        lines.push(format!(
            "- [{}] {} {}: {}",
            violation.kind.as_str(),
            violation.entity,
            violation.id,
            violation.message
        ));
    }
}

fn recommendations(summary: &ValidationSummary) -> Vec<String> {
    let mut lines = Vec::new();
    let has = |kind: &str| summary.errors_by_kind.contains_key(kind);
    if has("foreign_key") || has("cardinality") {
        lines.push("- check that every stage ran in dependency order.".to_string());
    }
    if has("temporal_order") || has("strict_order") || has("not_in_future") {
        lines.push("- review time windows; a reference time before the history start collapses them.".to_string());
    }
    if has("percentage_sum") {
        lines.push("- department shares must add up to 1.0.".to_string());
    }
    if has("cycle") || has("self_reference") {
        lines.push("- dependency edges must point from earlier to later tasks.".to_string());
    }
    if summary.warnings_by_kind.contains_key("done_bucket") {
        lines.push("- completed tasks outside the done section look unrealistic on boards.".to_string());
    }
    if summary.passed && summary.warning_count == 0 {
        lines.push("- no violations detected; compare metrics across runs for drift.".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ConsistencyValidator;

    #[test]
    fn failing_summary_lists_errors_and_advice() {
        let mut validator = ConsistencyValidator::new();
        validator.foreign_key("team", "t1", "department_id", "d9", false);
        let summary = validator.summary(20);
        let report = render_report(
            &RunInfo {
                run_id: "abc".to_string(),
                seed: Some(42),
                reference_time: "2024-06-30 12:00:00".to_string(),
            },
            &summary,
            &DistributionMetrics::default(),
        );

        assert!(report.contains("- result: FAIL"));
        assert!(report.contains("- seed: 42"));
        assert!(report.contains("## Top errors"));
        assert!(report.contains("[foreign_key] team t1"));
        assert!(report.contains("dependency order"));
        assert!(!report.contains("## Warnings"));
    }
}
