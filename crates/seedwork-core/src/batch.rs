use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::entities::{
    Department, Organization, Project, Section, Task, TaskDependency, TaskProject, Team,
    TeamMembership, User,
};
use crate::record::ToRecord;

/// Every collection produced by one generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Reference time the run treated as "now".
    pub now: Option<NaiveDateTime>,
    pub organizations: Vec<Organization>,
    pub departments: Vec<Department>,
    pub users: Vec<User>,
    pub teams: Vec<Team>,
    pub team_memberships: Vec<TeamMembership>,
    pub projects: Vec<Project>,
    pub sections: Vec<Section>,
    pub tasks: Vec<Task>,
    pub task_projects: Vec<TaskProject>,
    pub task_dependencies: Vec<TaskDependency>,
}

impl Batch {
    /// Row counts keyed by persisted table name.
    pub fn row_counts(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            (Organization::TABLE, self.organizations.len()),
            (Department::TABLE, self.departments.len()),
            (User::TABLE, self.users.len()),
            (Team::TABLE, self.teams.len()),
            (TeamMembership::TABLE, self.team_memberships.len()),
            (Project::TABLE, self.projects.len()),
            (Section::TABLE, self.sections.len()),
            (Task::TABLE, self.tasks.len()),
            (TaskProject::TABLE, self.task_projects.len()),
            (TaskDependency::TABLE, self.task_dependencies.len()),
        ])
    }

    pub fn dependency_edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.task_dependencies.iter().map(|dependency| {
            (
                dependency.blocking_task_id.as_str(),
                dependency.blocked_task_id.as_str(),
            )
        })
    }
}
