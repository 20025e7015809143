use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::toposort;

/// One topological step of the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Organizations,
    Departments,
    Users,
    Teams,
    TeamMemberships,
    Projects,
    Tasks,
    TaskDependencies,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Organizations,
        Stage::Departments,
        Stage::Users,
        Stage::Teams,
        Stage::TeamMemberships,
        Stage::Projects,
        Stage::Tasks,
        Stage::TaskDependencies,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Organizations => "organizations",
            Stage::Departments => "departments",
            Stage::Users => "users",
            Stage::Teams => "teams",
            Stage::TeamMemberships => "team_memberships",
            Stage::Projects => "projects",
            Stage::Tasks => "tasks",
            Stage::TaskDependencies => "task_dependencies",
        }
    }

    /// Stages whose full output this stage reads.
    pub fn upstream(self) -> &'static [Stage] {
        match self {
            Stage::Organizations => &[],
            Stage::Departments => &[Stage::Organizations],
            Stage::Users => &[Stage::Organizations, Stage::Departments],
            Stage::Teams => &[Stage::Organizations, Stage::Departments, Stage::Users],
            Stage::TeamMemberships => &[Stage::Users, Stage::Teams],
            Stage::Projects => &[Stage::Organizations, Stage::Users, Stage::Teams],
            Stage::Tasks => &[Stage::Users, Stage::TeamMemberships, Stage::Projects],
            Stage::TaskDependencies => &[Stage::Tasks],
        }
    }

    fn from_name(name: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.name() == name)
    }
}

/// Resolve the execution order from the declared upstream edges.
///
/// Ties are broken by the declaration order in [`Stage::ALL`], so the result
/// is the canonical pipeline
/// `organizations → departments → users → teams → team_memberships →
/// projects → tasks → task_dependencies`.
pub fn stage_order() -> Result<Vec<Stage>> {
    let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for stage in Stage::ALL {
        graph.entry(sort_key(stage)).or_default();
        for parent in stage.upstream() {
            graph
                .entry(sort_key(*parent))
                .or_default()
                .insert(sort_key(stage));
        }
    }

    let order = toposort(&graph).map_err(Error::Cycle)?;

    order
        .iter()
        .map(|key| {
            key.split_once(':')
                .and_then(|(_, name)| Stage::from_name(name))
                .ok_or_else(|| Error::Other(format!("unknown stage key {key}")))
        })
        .collect()
}

fn sort_key(stage: Stage) -> String {
    let position = Stage::ALL
        .iter()
        .position(|candidate| *candidate == stage)
        .unwrap_or(usize::MAX);
    format!("{position:02}:{}", stage.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_matches_pipeline() {
        assert_eq!(stage_order().unwrap(), Stage::ALL.to_vec());
    }

    #[test]
    fn every_upstream_precedes_its_stage() {
        let order = stage_order().unwrap();
        for (position, stage) in order.iter().enumerate() {
            for parent in stage.upstream() {
                let parent_position = order.iter().position(|s| s == parent).unwrap();
                assert!(parent_position < position, "{parent:?} after {stage:?}");
            }
        }
    }
}
