use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use seedwork_core::{Batch, ProjectType};

/// Metrics contract version for batch evaluation.
pub const METRICS_VERSION: &str = "0.1";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Distribution figures used to eyeball realism of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionMetrics {
    pub metrics_version: String,
    pub row_counts: BTreeMap<String, u64>,
    pub tasks: u64,
    pub unassigned_rate: f64,
    pub manager_created_rate: f64,
    pub tasks_with_due_date_rate: f64,
    pub milestone_rate: f64,
    pub archived_project_rate: f64,
    pub completion_by_project_type: BTreeMap<String, CompletionStats>,
    /// Task creations per weekday, Monday first.
    pub created_by_weekday: BTreeMap<String, u64>,
    pub weekend_creation_rate: f64,
    pub secondary_membership_rate: f64,
    pub dependencies_per_task: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionStats {
    pub tasks: u64,
    pub completed: u64,
    pub rate: f64,
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Collect distribution metrics over a finished batch.
pub fn collect_metrics(batch: &Batch) -> DistributionMetrics {
    let tasks = batch.tasks.len();

    let row_counts = batch
        .row_counts()
        .into_iter()
        .map(|(table, rows)| (table.to_string(), rows as u64))
        .collect();

    let unassigned = batch
        .tasks
        .iter()
        .filter(|task| task.assignee_id.is_none())
        .count();

    let managers: BTreeSet<&str> = batch
        .users
        .iter()
        .filter(|user| user.is_manager)
        .map(|user| user.id.as_str())
        .collect();
    let manager_created = batch
        .tasks
        .iter()
        .filter(|task| managers.contains(task.created_by_id.as_str()))
        .count();

    let with_due = batch.tasks.iter().filter(|task| task.due_date.is_some()).count();
    let milestones = batch.tasks.iter().filter(|task| task.is_milestone).count();
    let archived = batch
        .projects
        .iter()
        .filter(|project| project.is_archived)
        .count();

    let mut created_by_weekday: BTreeMap<String, u64> = WEEKDAYS
        .iter()
        .enumerate()
        .map(|(index, day)| (format!("{}_{day}", index + 1), 0))
        .collect();
    let mut weekend = 0;
    for task in &batch.tasks {
        let index = task.created_at.weekday().num_days_from_monday() as usize;
        if index >= 5 {
            weekend += 1;
        }
        *created_by_weekday
            .entry(format!("{}_{}", index + 1, WEEKDAYS[index]))
            .or_default() += 1;
    }

    let project_types: BTreeMap<&str, ProjectType> = batch
        .projects
        .iter()
        .map(|project| (project.id.as_str(), project.project_type))
        .collect();
    let completed: BTreeMap<&str, bool> = batch
        .tasks
        .iter()
        .map(|task| (task.id.as_str(), task.is_completed))
        .collect();
    let mut completion_by_project_type: BTreeMap<String, CompletionStats> = BTreeMap::new();
    for placement in &batch.task_projects {
        let (Some(project_type), Some(done)) = (
            project_types.get(placement.project_id.as_str()),
            completed.get(placement.task_id.as_str()),
        ) else {
            continue;
        };
        let stats = completion_by_project_type
            .entry(project_type.as_str().to_string())
            .or_default();
        stats.tasks += 1;
        if *done {
            stats.completed += 1;
        }
    }
    for stats in completion_by_project_type.values_mut() {
        stats.rate = ratio(stats.completed as usize, stats.tasks as usize);
    }

    let secondary = batch
        .team_memberships
        .iter()
        .filter(|membership| !membership.is_primary_team)
        .count();

    DistributionMetrics {
        metrics_version: METRICS_VERSION.to_string(),
        row_counts,
        tasks: tasks as u64,
        unassigned_rate: ratio(unassigned, tasks),
        manager_created_rate: ratio(manager_created, tasks),
        tasks_with_due_date_rate: ratio(with_due, tasks),
        milestone_rate: ratio(milestones, tasks),
        archived_project_rate: ratio(archived, batch.projects.len()),
        completion_by_project_type,
        created_by_weekday,
        weekend_creation_rate: ratio(weekend, tasks),
        secondary_membership_rate: ratio(secondary, batch.users.len()),
        dependencies_per_task: ratio(batch.task_dependencies.len(), tasks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_has_zero_rates() {
        let metrics = collect_metrics(&Batch::default());
        assert_eq!(metrics.tasks, 0);
        assert_eq!(metrics.unassigned_rate, 0.0);
        assert_eq!(metrics.created_by_weekday.len(), 7);
        assert!(metrics.completion_by_project_type.is_empty());
    }

    #[test]
    fn weekday_keys_sort_monday_first() {
        let metrics = collect_metrics(&Batch::default());
        let keys: Vec<&str> = metrics.created_by_weekday.keys().map(String::as_str).collect();
        assert_eq!(keys.first(), Some(&"1_Mon"));
        assert_eq!(keys.last(), Some(&"7_Sun"));
    }
}
