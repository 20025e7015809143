use chrono::{NaiveDate, NaiveDateTime};

use crate::entities::{
    Department, Organization, Project, Section, Task, TaskDependency, TaskProject, Team,
    TeamMembership, User,
};

/// Timestamp layout expected by downstream consumers.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Date layout expected by downstream consumers.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Scalar value of a persisted field.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Textual form used by the CSV sink; null renders empty.
    pub fn render(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(value) => value.to_string(),
            Scalar::Int(value) => value.to_string(),
            Scalar::Float(value) => value.to_string(),
            Scalar::Text(value) => value.clone(),
            Scalar::Date(value) => value.format(DATE_FORMAT).to_string(),
            Scalar::Timestamp(value) => value.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<&String> for Scalar {
    fn from(value: &String) -> Self {
        Scalar::Text(value.clone())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(value: NaiveDate) -> Self {
        Scalar::Date(value)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(value: NaiveDateTime) -> Self {
        Scalar::Timestamp(value)
    }
}

impl<T> From<Option<T>> for Scalar
where
    T: Into<Scalar>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// Ordered field-name to scalar mapping for one persisted row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(&'static str, Scalar)>,
}

impl Record {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn field(mut self, name: &'static str, value: impl Into<Scalar>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl Iterator<Item = &Scalar> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Persisted shape of an entity: table name, column order and row values.
pub trait ToRecord {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn to_record(&self) -> Record;
}

impl ToRecord for Organization {
    const TABLE: &'static str = "organizations";
    const COLUMNS: &'static [&'static str] = &["id", "name", "domain", "created_at"];

    fn to_record(&self) -> Record {
        Record::with_capacity(Self::COLUMNS.len())
            .field("id", &self.id)
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("created_at", self.created_at)
    }
}

impl ToRecord for Department {
    const TABLE: &'static str = "departments";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "name",
        "description",
        "user_percentage",
        "workflow_type",
        "created_at",
    ];

    fn to_record(&self) -> Record {
        Record::with_capacity(Self::COLUMNS.len())
            .field("id", &self.id)
            .field("organization_id", &self.organization_id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("user_percentage", self.user_percentage)
            .field("workflow_type", self.workflow_type.as_str())
            .field("created_at", self.created_at)
    }
}

impl ToRecord for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "department_id",
        "first_name",
        "last_name",
        "email",
        "job_title",
        "is_manager",
        "is_active",
        "created_at",
        "last_active_at",
    ];

    fn to_record(&self) -> Record {
        Record::with_capacity(Self::COLUMNS.len())
            .field("id", &self.id)
            .field("organization_id", &self.organization_id)
            .field("department_id", &self.department_id)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("job_title", &self.job_title)
            .field("is_manager", self.is_manager)
            .field("is_active", self.is_active)
            .field("created_at", self.created_at)
            .field("last_active_at", self.last_active_at)
    }
}

impl ToRecord for Team {
    const TABLE: &'static str = "teams";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "department_id",
        "organization_id",
        "name",
        "description",
        "created_at",
    ];

    fn to_record(&self) -> Record {
        Record::with_capacity(Self::COLUMNS.len())
            .field("id", &self.id)
            .field("department_id", &self.department_id)
            .field("organization_id", &self.organization_id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("created_at", self.created_at)
    }
}

impl ToRecord for TeamMembership {
    const TABLE: &'static str = "team_memberships";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "team_id",
        "user_id",
        "role",
        "is_primary_team",
        "joined_at",
    ];

    fn to_record(&self) -> Record {
        Record::with_capacity(Self::COLUMNS.len())
            .field("id", &self.id)
            .field("team_id", &self.team_id)
            .field("user_id", &self.user_id)
            .field("role", self.role.as_str())
            .field("is_primary_team", self.is_primary_team)
            .field("joined_at", self.joined_at)
    }
}

impl ToRecord for Project {
    const TABLE: &'static str = "projects";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "team_id",
        "organization_id",
        "name",
        "description",
        "color",
        "is_archived",
        "is_public",
        "project_type",
        "created_by_id",
        "start_date",
        "due_date",
        "created_at",
        "updated_at",
    ];

    fn to_record(&self) -> Record {
        Record::with_capacity(Self::COLUMNS.len())
            .field("id", &self.id)
            .field("team_id", &self.team_id)
            .field("organization_id", &self.organization_id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("color", &self.color)
            .field("is_archived", self.is_archived)
            .field("is_public", self.is_public)
            .field("project_type", self.project_type.as_str())
            .field("created_by_id", &self.created_by_id)
            .field("start_date", self.start_date)
            .field("due_date", self.due_date)
            .field("created_at", self.created_at)
            .field("updated_at", self.updated_at)
    }
}

impl ToRecord for Section {
    const TABLE: &'static str = "sections";
    const COLUMNS: &'static [&'static str] =
        &["id", "project_id", "name", "position", "created_at"];

    fn to_record(&self) -> Record {
        Record::with_capacity(Self::COLUMNS.len())
            .field("id", &self.id)
            .field("project_id", &self.project_id)
            .field("name", &self.name)
            .field("position", self.position)
            .field("created_at", self.created_at)
    }
}

impl ToRecord for Task {
    const TABLE: &'static str = "tasks";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "name",
        "description",
        "assignee_id",
        "created_by_id",
        "is_completed",
        "completed_at",
        "completed_by_id",
        "priority",
        "due_date",
        "is_milestone",
        "estimated_hours",
        "num_likes",
        "created_at",
        "updated_at",
    ];

    fn to_record(&self) -> Record {
        Record::with_capacity(Self::COLUMNS.len())
            .field("id", &self.id)
            .field("organization_id", &self.organization_id)
            .field("name", &self.name)
            .field("description", self.description.as_ref())
            .field("assignee_id", self.assignee_id.as_ref())
            .field("created_by_id", &self.created_by_id)
            .field("is_completed", self.is_completed)
            .field("completed_at", self.completed_at)
            .field("completed_by_id", self.completed_by_id.as_ref())
            .field("priority", self.priority.as_str())
            .field("due_date", self.due_date)
            .field("is_milestone", self.is_milestone)
            .field("estimated_hours", self.estimated_hours)
            .field("num_likes", self.num_likes)
            .field("created_at", self.created_at)
            .field("updated_at", self.updated_at)
    }
}

impl ToRecord for TaskProject {
    const TABLE: &'static str = "task_projects";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "task_id",
        "project_id",
        "section_id",
        "position",
        "added_at",
    ];

    fn to_record(&self) -> Record {
        Record::with_capacity(Self::COLUMNS.len())
            .field("id", &self.id)
            .field("task_id", &self.task_id)
            .field("project_id", &self.project_id)
            .field("section_id", &self.section_id)
            .field("position", self.position)
            .field("added_at", self.added_at)
    }
}

impl ToRecord for TaskDependency {
    const TABLE: &'static str = "task_dependencies";
    const COLUMNS: &'static [&'static str] =
        &["id", "blocking_task_id", "blocked_task_id", "created_at"];

    fn to_record(&self) -> Record {
        Record::with_capacity(Self::COLUMNS.len())
            .field("id", &self.id)
            .field("blocking_task_id", &self.blocking_task_id)
            .field("blocked_task_id", &self.blocked_task_id)
            .field("created_at", self.created_at)
    }
}

/// Convert a finished collection into persisted rows.
pub fn to_records<T: ToRecord>(items: &[T]) -> Vec<Record> {
    items.iter().map(ToRecord::to_record).collect()
}
