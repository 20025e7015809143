use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use seedwork_core::{DependencyGraph, Task, TaskDependency, TaskProject};

use super::StageContext;
use crate::errors::GenerationError;
use crate::model::GenerationReport;

type Edge<'a> = (&'a Task, &'a Task);

/// Blocking edges between tasks of the same project. Only earlier tasks can
/// block later ones; any edge that still closes a cycle is dropped.
pub fn generate(
    ctx: &mut StageContext<'_>,
    tasks: &[Task],
    task_projects: &[TaskProject],
) -> Result<Vec<TaskDependency>, GenerationError> {
    let by_id: BTreeMap<&str, &Task> = tasks.iter().map(|task| (task.id.as_str(), task)).collect();

    let mut by_project: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
    for placement in task_projects {
        if let Some(task) = by_id.get(placement.task_id.as_str()).copied() {
            by_project
                .entry(placement.project_id.as_str())
                .or_default()
                .push(task);
        }
    }

    let mut edges: Vec<Edge<'_>> = Vec::new();
    for project_tasks in by_project.values_mut() {
        project_tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        for index in 1..project_tasks.len() {
            if !ctx.rng.random_bool(ctx.config.dependency_rate) {
                continue;
            }
            let blocking = project_tasks[ctx.rng.random_range(0..index)];
            edges.push((blocking, project_tasks[index]));
        }
    }

    let edges = drop_cycle_edges(edges, ctx.report);
    let mut dependencies = Vec::with_capacity(edges.len());
    for (blocking, blocked) in edges {
        dependencies.push(TaskDependency {
            id: ctx.next_id(),
            blocking_task_id: blocking.id.clone(),
            blocked_task_id: blocked.id.clone(),
            created_at: blocking.created_at.max(blocked.created_at),
        });
    }

    Ok(dependencies)
}

/// Remove the closing edge of every reported cycle until none remain.
pub fn drop_cycle_edges<'a>(
    mut edges: Vec<Edge<'a>>,
    report: &mut GenerationReport,
) -> Vec<Edge<'a>> {
    loop {
        let graph = DependencyGraph::from_edges(
            edges
                .iter()
                .map(|(blocking, blocked)| (blocking.id.as_str(), blocked.id.as_str())),
        );
        let cycles = graph.find_cycles();
        if cycles.is_empty() {
            return edges;
        }

        for cycle in cycles {
            let [.., from, to] = cycle.as_slice() else {
                continue;
            };
            if let Some(position) = edges
                .iter()
                .position(|(blocking, blocked)| blocking.id == *from && blocked.id == *to)
            {
                edges.remove(position);
                debug!(blocking = %from, blocked = %to, "dependency edge closes a cycle; dropped");
                report.record_dropped_edge();
            }
        }
    }
}
