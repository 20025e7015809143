//! Batch consistency checks.
//!
//! [`ConsistencyValidator`] knows nothing about entities: each method takes
//! the field values to compare and records a [`Violation`] when the check
//! fails. [`validate_batch`] walks a whole [`Batch`] and feeds it through
//! those methods.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use seedwork_core::{Batch, Organization, Project, Task, Team, User, find_cycles};

use crate::model::{Severity, ValidationSummary, Violation, ViolationKind};

const PERCENTAGE_TOLERANCE: f64 = 1e-6;

/// Accumulates violations; one method per invariant class.
#[derive(Debug, Default)]
pub struct ConsistencyValidator {
    errors: Vec<Violation>,
    warnings: Vec<Violation>,
}

impl ConsistencyValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[Violation] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Violation] {
        &self.warnings
    }

    /// `earlier <= later`.
    pub fn temporal_order(
        &mut self,
        entity: &str,
        id: &str,
        earlier_field: &str,
        earlier: NaiveDateTime,
        later_field: &str,
        later: NaiveDateTime,
    ) {
        if earlier > later {
            self.error(
                ViolationKind::TemporalOrder,
                entity,
                id,
                format!("{earlier_field} ({earlier}) is after {later_field} ({later})"),
            );
        }
    }

    /// `earlier < later`.
    pub fn strict_order(
        &mut self,
        entity: &str,
        id: &str,
        earlier_field: &str,
        earlier: NaiveDateTime,
        later_field: &str,
        later: NaiveDateTime,
    ) {
        if earlier >= later {
            self.error(
                ViolationKind::StrictOrder,
                entity,
                id,
                format!("{earlier_field} ({earlier}) is not before {later_field} ({later})"),
            );
        }
    }

    pub fn not_in_future(
        &mut self,
        entity: &str,
        id: &str,
        field: &str,
        value: NaiveDateTime,
        now: NaiveDateTime,
    ) {
        if value > now {
            self.error(
                ViolationKind::NotInFuture,
                entity,
                id,
                format!("{field} ({value}) is after the reference time ({now})"),
            );
        }
    }

    pub fn foreign_key(&mut self, entity: &str, id: &str, field: &str, target: &str, exists: bool) {
        if !exists {
            self.error(
                ViolationKind::ForeignKey,
                entity,
                id,
                format!("{field} references missing record '{target}'"),
            );
        }
    }

    /// A record and the record it hangs off must share `organization_id`.
    pub fn same_organization(
        &mut self,
        entity: &str,
        id: &str,
        organization_id: &str,
        parent: &str,
        parent_organization_id: &str,
    ) {
        if organization_id != parent_organization_id {
            self.error(
                ViolationKind::ForeignKey,
                entity,
                id,
                format!(
                    "organization_id '{organization_id}' differs from {parent}.organization_id '{parent_organization_id}'"
                ),
            );
        }
    }

    pub fn cardinality(&mut self, entity: &str, id: &str, what: &str, expected: usize, actual: usize) {
        if expected != actual {
            self.error(
                ViolationKind::Cardinality,
                entity,
                id,
                format!("expected {expected} {what}, found {actual}"),
            );
        }
    }

    pub fn self_reference(&mut self, entity: &str, id: &str, from: &str, to: &str) {
        if from == to {
            self.error(
                ViolationKind::SelfReference,
                entity,
                id,
                format!("'{from}' references itself"),
            );
        }
    }

    pub fn percentage_sum(&mut self, entity: &str, id: &str, total: f64) {
        if (total - 1.0).abs() > PERCENTAGE_TOLERANCE {
            self.error(
                ViolationKind::PercentageSum,
                entity,
                id,
                format!("percentages sum to {total}, expected 1.0"),
            );
        }
    }

    /// `value <= bound`.
    pub fn date_bound(
        &mut self,
        entity: &str,
        id: &str,
        field: &str,
        value: NaiveDate,
        bound_field: &str,
        bound: NaiveDate,
    ) {
        if value > bound {
            self.error(
                ViolationKind::DateBound,
                entity,
                id,
                format!("{field} ({value}) is after {bound_field} ({bound})"),
            );
        }
    }

    /// Soft check: completed work belongs in the board's done section.
    pub fn done_bucket(&mut self, entity: &str, id: &str, section: &str, done: &str) {
        if section != done {
            self.warning(
                ViolationKind::DoneBucket,
                entity,
                id,
                format!("completed but placed in '{section}' instead of '{done}'"),
            );
        }
    }

    pub fn cycle(&mut self, nodes: &[String]) {
        let id = nodes.first().cloned().unwrap_or_default();
        self.error(
            ViolationKind::Cycle,
            "task_dependency",
            &id,
            format!("dependency cycle {}", nodes.join(" -> ")),
        );
    }

    /// Pass/fail plus the first `max_examples` of each severity.
    pub fn summary(&self, max_examples: usize) -> ValidationSummary {
        ValidationSummary {
            passed: self.errors.is_empty(),
            error_count: self.errors.len() as u64,
            warning_count: self.warnings.len() as u64,
            errors_by_kind: count_by_kind(&self.errors),
            warnings_by_kind: count_by_kind(&self.warnings),
            errors: self.errors.iter().take(max_examples).cloned().collect(),
            warnings: self.warnings.iter().take(max_examples).cloned().collect(),
        }
    }

    fn error(&mut self, kind: ViolationKind, entity: &str, id: &str, message: String) {
        self.errors.push(violation(kind, Severity::Error, entity, id, message));
    }

    fn warning(&mut self, kind: ViolationKind, entity: &str, id: &str, message: String) {
        self.warnings.push(violation(kind, Severity::Warning, entity, id, message));
    }
}

fn violation(
    kind: ViolationKind,
    severity: Severity,
    entity: &str,
    id: &str,
    message: String,
) -> Violation {
    Violation {
        kind,
        severity,
        entity: entity.to_string(),
        id: id.to_string(),
        message,
    }
}

fn count_by_kind(violations: &[Violation]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for violation in violations {
        *counts.entry(violation.kind.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

fn index<T>(items: &[T], key: impl Fn(&T) -> &str) -> BTreeMap<&str, &T> {
    items.iter().map(|item| (key(item), item)).collect()
}

/// Audit every collection of `batch` against the full invariant set.
pub fn validate_batch(batch: &Batch, now: NaiveDateTime) -> ConsistencyValidator {
    let mut v = ConsistencyValidator::new();

    let organizations = index(&batch.organizations, |org| org.id.as_str());
    let departments = index(&batch.departments, |department| department.id.as_str());
    let users = index(&batch.users, |user| user.id.as_str());
    let teams = index(&batch.teams, |team| team.id.as_str());
    let projects = index(&batch.projects, |project| project.id.as_str());
    let sections = index(&batch.sections, |section| section.id.as_str());
    let tasks = index(&batch.tasks, |task| task.id.as_str());

    for org in &batch.organizations {
        v.not_in_future("organization", &org.id, "created_at", org.created_at, now);
    }

    let mut shares: BTreeMap<&str, f64> = BTreeMap::new();
    for department in &batch.departments {
        let org = organizations.get(department.organization_id.as_str());
        v.foreign_key(
            "department",
            &department.id,
            "organization_id",
            &department.organization_id,
            org.is_some(),
        );
        if let Some(org) = org {
            v.temporal_order(
                "department",
                &department.id,
                "organization.created_at",
                org.created_at,
                "created_at",
                department.created_at,
            );
        }
        *shares.entry(department.organization_id.as_str()).or_default() +=
            department.user_percentage;
    }
    for (org_id, total) in shares {
        v.percentage_sum("organization", org_id, total);
    }

    for user in &batch.users {
        let org = organizations.get(user.organization_id.as_str());
        v.foreign_key("user", &user.id, "organization_id", &user.organization_id, org.is_some());
        let department = departments.get(user.department_id.as_str());
        v.foreign_key("user", &user.id, "department_id", &user.department_id, department.is_some());
        if let Some(department) = department {
            v.same_organization(
                "user",
                &user.id,
                &user.organization_id,
                "department",
                &department.organization_id,
            );
        }
        if let Some(org) = org {
            v.temporal_order(
                "user",
                &user.id,
                "organization.created_at",
                org.created_at,
                "created_at",
                user.created_at,
            );
        }
        v.temporal_order(
            "user",
            &user.id,
            "created_at",
            user.created_at,
            "last_active_at",
            user.last_active_at,
        );
        v.not_in_future("user", &user.id, "last_active_at", user.last_active_at, now);
    }

    for team in &batch.teams {
        let org = organizations.get(team.organization_id.as_str());
        v.foreign_key("team", &team.id, "organization_id", &team.organization_id, org.is_some());
        let department = departments.get(team.department_id.as_str());
        v.foreign_key("team", &team.id, "department_id", &team.department_id, department.is_some());
        if let Some(department) = department {
            v.same_organization(
                "team",
                &team.id,
                &team.organization_id,
                "department",
                &department.organization_id,
            );
        }
        if let Some(org) = org {
            v.temporal_order(
                "team",
                &team.id,
                "organization.created_at",
                org.created_at,
                "created_at",
                team.created_at,
            );
        }
        v.not_in_future("team", &team.id, "created_at", team.created_at, now);
    }

    let mut primaries: BTreeMap<&str, usize> = BTreeMap::new();
    for membership in &batch.team_memberships {
        let entity = "team_membership";
        let user = users.get(membership.user_id.as_str());
        let team = teams.get(membership.team_id.as_str());
        v.foreign_key(entity, &membership.id, "user_id", &membership.user_id, user.is_some());
        v.foreign_key(entity, &membership.id, "team_id", &membership.team_id, team.is_some());
        if let Some(user) = user {
            v.temporal_order(
                entity,
                &membership.id,
                "user.created_at",
                user.created_at,
                "joined_at",
                membership.joined_at,
            );
        }
        if let Some(team) = team {
            v.temporal_order(
                entity,
                &membership.id,
                "team.created_at",
                team.created_at,
                "joined_at",
                membership.joined_at,
            );
        }
        v.not_in_future(entity, &membership.id, "joined_at", membership.joined_at, now);
        if membership.is_primary_team {
            *primaries.entry(membership.user_id.as_str()).or_default() += 1;
        }
    }
    for user in &batch.users {
        let count = primaries.get(user.id.as_str()).copied().unwrap_or(0);
        v.cardinality("user", &user.id, "primary team memberships", 1, count);
    }

    for project in &batch.projects {
        validate_project(&mut v, project, &organizations, &teams, &users, now);
    }

    for section in &batch.sections {
        let project = projects.get(section.project_id.as_str());
        v.foreign_key("section", &section.id, "project_id", &section.project_id, project.is_some());
        if let Some(project) = project {
            v.temporal_order(
                "section",
                &section.id,
                "project.created_at",
                project.created_at,
                "created_at",
                section.created_at,
            );
            v.temporal_order(
                "section",
                &section.id,
                "created_at",
                section.created_at,
                "project.created_at",
                project.created_at,
            );
        }
    }

    let mut placements: BTreeMap<&str, usize> = BTreeMap::new();
    let mut task_project: BTreeMap<&str, &Project> = BTreeMap::new();
    for placement in &batch.task_projects {
        let entity = "task_project";
        let task = tasks.get(placement.task_id.as_str());
        let project = projects.get(placement.project_id.as_str());
        let section = sections.get(placement.section_id.as_str());
        v.foreign_key(entity, &placement.id, "task_id", &placement.task_id, task.is_some());
        v.foreign_key(entity, &placement.id, "project_id", &placement.project_id, project.is_some());
        v.foreign_key(
            entity,
            &placement.id,
            "section_id",
            &placement.section_id,
            section.is_some_and(|section| section.project_id == placement.project_id),
        );
        *placements.entry(placement.task_id.as_str()).or_default() += 1;

        if let Some(task) = task {
            v.temporal_order(
                entity,
                &placement.id,
                "task.created_at",
                task.created_at,
                "added_at",
                placement.added_at,
            );
            v.temporal_order(
                entity,
                &placement.id,
                "added_at",
                placement.added_at,
                "task.created_at",
                task.created_at,
            );
            if let Some(project) = project {
                task_project.insert(task.id.as_str(), *project);
                if let Some(section) = section.filter(|_| task.is_completed) {
                    v.done_bucket("task", &task.id, &section.name, project.project_type.board().done);
                }
            }
        }
    }

    for task in &batch.tasks {
        let count = placements.get(task.id.as_str()).copied().unwrap_or(0);
        v.cardinality("task", &task.id, "project placements", 1, count);
        let project = task_project.get(task.id.as_str()).copied();
        validate_task(&mut v, task, project, &organizations, &users, now);
    }

    for dependency in &batch.task_dependencies {
        let entity = "task_dependency";
        let blocking = tasks.get(dependency.blocking_task_id.as_str());
        let blocked = tasks.get(dependency.blocked_task_id.as_str());
        v.foreign_key(
            entity,
            &dependency.id,
            "blocking_task_id",
            &dependency.blocking_task_id,
            blocking.is_some(),
        );
        v.foreign_key(
            entity,
            &dependency.id,
            "blocked_task_id",
            &dependency.blocked_task_id,
            blocked.is_some(),
        );
        v.self_reference(
            entity,
            &dependency.id,
            &dependency.blocking_task_id,
            &dependency.blocked_task_id,
        );
        for (field, task) in [("blocking.created_at", blocking), ("blocked.created_at", blocked)] {
            if let Some(task) = task {
                v.temporal_order(
                    entity,
                    &dependency.id,
                    field,
                    task.created_at,
                    "created_at",
                    dependency.created_at,
                );
            }
        }
    }
    for cycle in find_cycles(batch.dependency_edges()) {
        v.cycle(&cycle);
    }

    v
}

fn validate_project(
    v: &mut ConsistencyValidator,
    project: &Project,
    organizations: &BTreeMap<&str, &Organization>,
    teams: &BTreeMap<&str, &Team>,
    users: &BTreeMap<&str, &User>,
    now: NaiveDateTime,
) {
    let entity = "project";
    let id = project.id.as_str();
    let team = teams.get(project.team_id.as_str());
    v.foreign_key(
        entity,
        id,
        "organization_id",
        &project.organization_id,
        organizations.contains_key(project.organization_id.as_str()),
    );
    v.foreign_key(entity, id, "team_id", &project.team_id, team.is_some());
    v.foreign_key(
        entity,
        id,
        "created_by_id",
        &project.created_by_id,
        users.contains_key(project.created_by_id.as_str()),
    );
    if let Some(team) = team {
        v.same_organization(entity, id, &project.organization_id, "team", &team.organization_id);
        v.temporal_order(entity, id, "team.created_at", team.created_at, "created_at", project.created_at);
    }

    let created = project.created_at.date();
    v.date_bound(entity, id, "start_date", project.start_date, "created_at date", created);
    v.date_bound(entity, id, "created_at date", created, "start_date", project.start_date);
    v.date_bound(entity, id, "start_date", project.start_date, "due_date", project.due_date);

    v.temporal_order(entity, id, "created_at", project.created_at, "updated_at", project.updated_at);
    v.not_in_future(entity, id, "updated_at", project.updated_at, now);
    if project.updated_at != project.created_at {
        v.temporal_order(
            entity,
            id,
            "updated_at",
            project.updated_at,
            "due_date",
            project.due_date.and_time(NaiveTime::MIN),
        );
    }
}

fn validate_task(
    v: &mut ConsistencyValidator,
    task: &Task,
    project: Option<&Project>,
    organizations: &BTreeMap<&str, &Organization>,
    users: &BTreeMap<&str, &User>,
    now: NaiveDateTime,
) {
    let entity = "task";
    let id = task.id.as_str();
    v.foreign_key(
        entity,
        id,
        "organization_id",
        &task.organization_id,
        organizations.contains_key(task.organization_id.as_str()),
    );
    v.foreign_key(
        entity,
        id,
        "created_by_id",
        &task.created_by_id,
        users.contains_key(task.created_by_id.as_str()),
    );
    for (field, user) in [
        ("assignee_id", task.assignee_id.as_deref()),
        ("completed_by_id", task.completed_by_id.as_deref()),
    ] {
        if let Some(user) = user {
            v.foreign_key(entity, id, field, user, users.contains_key(user));
        }
    }

    if let Some(project) = project {
        v.same_organization(entity, id, &task.organization_id, "project", &project.organization_id);
        v.temporal_order(entity, id, "project.created_at", project.created_at, "created_at", task.created_at);
        if let Some(due) = task.due_date {
            v.date_bound(entity, id, "due_date", due, "project.due_date", project.due_date);
        }
    }

    v.temporal_order(entity, id, "created_at", task.created_at, "updated_at", task.updated_at);
    v.not_in_future(entity, id, "updated_at", task.updated_at, now);

    match (task.is_completed, task.completed_at) {
        (true, Some(completed_at)) => {
            v.strict_order(entity, id, "created_at", task.created_at, "completed_at", completed_at);
            v.not_in_future(entity, id, "completed_at", completed_at, now);
            v.temporal_order(entity, id, "completed_at", completed_at, "updated_at", task.updated_at);
            v.temporal_order(entity, id, "updated_at", task.updated_at, "completed_at", completed_at);
        }
        (true, None) => v.cardinality(entity, id, "completed_at values on a completed task", 1, 0),
        (false, Some(_)) => v.cardinality(entity, id, "completed_at values on an open task", 0, 1),
        (false, None) => {}
    }
}
