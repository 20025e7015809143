use std::collections::HashMap;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use seedwork_core::{
    Batch, DATE_FORMAT, Department, MembershipRole, Organization, Priority, Project, ProjectType,
    Section, TIMESTAMP_FORMAT, Task, TaskDependency, TaskProject, Team, TeamMembership, ToRecord,
    User, WorkflowType,
};

use crate::errors::EvalError;

/// One CSV row with header-based lookup.
struct Row<'r> {
    table: &'static str,
    line: usize,
    headers: &'r HashMap<String, usize>,
    record: &'r csv::StringRecord,
}

impl Row<'_> {
    fn invalid(&self, column: &str, message: impl std::fmt::Display) -> EvalError {
        EvalError::InvalidDataset(format!(
            "{}.{} line {}: {message}",
            self.table, column, self.line
        ))
    }

    fn raw(&self, column: &str) -> Result<&str, EvalError> {
        let position = self
            .headers
            .get(column)
            .ok_or_else(|| self.invalid(column, "missing column"))?;
        Ok(self.record.get(*position).unwrap_or_default().trim())
    }

    fn text(&self, column: &str) -> Result<String, EvalError> {
        let value = self.raw(column)?;
        if value.is_empty() {
            return Err(self.invalid(column, "empty value"));
        }
        Ok(value.to_string())
    }

    fn optional(&self, column: &str) -> Result<Option<String>, EvalError> {
        let value = self.raw(column)?;
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn parsed<T: std::str::FromStr>(&self, column: &str) -> Result<T, EvalError> {
        let value = self.raw(column)?;
        value
            .parse()
            .map_err(|_| self.invalid(column, format!("cannot parse '{value}'")))
    }

    fn optional_parsed<T: std::str::FromStr>(&self, column: &str) -> Result<Option<T>, EvalError> {
        match self.raw(column)? {
            "" => Ok(None),
            _ => self.parsed(column).map(Some),
        }
    }

    fn timestamp(&self, column: &str) -> Result<NaiveDateTime, EvalError> {
        let value = self.raw(column)?;
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
            .map_err(|_| self.invalid(column, format!("invalid timestamp '{value}'")))
    }

    fn optional_timestamp(&self, column: &str) -> Result<Option<NaiveDateTime>, EvalError> {
        match self.raw(column)? {
            "" => Ok(None),
            _ => self.timestamp(column).map(Some),
        }
    }

    fn date(&self, column: &str) -> Result<NaiveDate, EvalError> {
        let value = self.raw(column)?;
        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map_err(|_| self.invalid(column, format!("invalid date '{value}'")))
    }

    fn optional_date(&self, column: &str) -> Result<Option<NaiveDate>, EvalError> {
        match self.raw(column)? {
            "" => Ok(None),
            _ => self.date(column).map(Some),
        }
    }

    fn variant<T>(&self, column: &str, parse: fn(&str) -> Option<T>) -> Result<T, EvalError> {
        let value = self.raw(column)?;
        parse(value).ok_or_else(|| self.invalid(column, format!("unknown value '{value}'")))
    }
}

fn load_table<T, F>(dir: &Path, parse: F) -> Result<Vec<T>, EvalError>
where
    T: ToRecord,
    F: Fn(&Row<'_>) -> Result<T, EvalError>,
{
    let path = dir.join(format!("{}.csv", T::TABLE));
    if !path.exists() {
        return Err(EvalError::MissingTable(path));
    }

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(&path)?;
    let headers: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(index, name)| (name.to_string(), index))
        .collect();
    for column in T::COLUMNS {
        if !headers.contains_key(*column) {
            return Err(EvalError::InvalidDataset(format!(
                "{} is missing column '{column}'",
                T::TABLE
            )));
        }
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = Row {
            table: T::TABLE,
            line: index + 2,
            headers: &headers,
            record: &record,
        };
        rows.push(parse(&row)?);
    }
    Ok(rows)
}

/// Read the ten table files written by the CSV sink back into a batch.
pub fn load_batch(dir: &Path) -> Result<Batch, EvalError> {
    Ok(Batch {
        now: None,
        organizations: load_table(dir, |row| {
            Ok(Organization {
                id: row.text("id")?,
                name: row.text("name")?,
                domain: row.text("domain")?,
                created_at: row.timestamp("created_at")?,
            })
        })?,
        departments: load_table(dir, |row| {
            Ok(Department {
                id: row.text("id")?,
                organization_id: row.text("organization_id")?,
                name: row.text("name")?,
                description: row.text("description")?,
                user_percentage: row.parsed("user_percentage")?,
                workflow_type: row.variant("workflow_type", WorkflowType::parse)?,
                created_at: row.timestamp("created_at")?,
            })
        })?,
        users: load_table(dir, |row| {
            Ok(User {
                id: row.text("id")?,
                organization_id: row.text("organization_id")?,
                department_id: row.text("department_id")?,
                first_name: row.text("first_name")?,
                last_name: row.text("last_name")?,
                email: row.text("email")?,
                job_title: row.text("job_title")?,
                is_manager: row.parsed("is_manager")?,
                is_active: row.parsed("is_active")?,
                created_at: row.timestamp("created_at")?,
                last_active_at: row.timestamp("last_active_at")?,
            })
        })?,
        teams: load_table(dir, |row| {
            Ok(Team {
                id: row.text("id")?,
                department_id: row.text("department_id")?,
                organization_id: row.text("organization_id")?,
                name: row.text("name")?,
                description: row.text("description")?,
                created_at: row.timestamp("created_at")?,
            })
        })?,
        team_memberships: load_table(dir, |row| {
            Ok(TeamMembership {
                id: row.text("id")?,
                team_id: row.text("team_id")?,
                user_id: row.text("user_id")?,
                role: row.variant("role", MembershipRole::parse)?,
                is_primary_team: row.parsed("is_primary_team")?,
                joined_at: row.timestamp("joined_at")?,
            })
        })?,
        projects: load_table(dir, |row| {
            Ok(Project {
                id: row.text("id")?,
                team_id: row.text("team_id")?,
                organization_id: row.text("organization_id")?,
                name: row.text("name")?,
                description: row.text("description")?,
                color: row.text("color")?,
                is_archived: row.parsed("is_archived")?,
                is_public: row.parsed("is_public")?,
                project_type: row.variant("project_type", ProjectType::parse)?,
                created_by_id: row.text("created_by_id")?,
                start_date: row.date("start_date")?,
                due_date: row.date("due_date")?,
                created_at: row.timestamp("created_at")?,
                updated_at: row.timestamp("updated_at")?,
            })
        })?,
        sections: load_table(dir, |row| {
            Ok(Section {
                id: row.text("id")?,
                project_id: row.text("project_id")?,
                name: row.text("name")?,
                position: row.parsed("position")?,
                created_at: row.timestamp("created_at")?,
            })
        })?,
        tasks: load_table(dir, |row| {
            Ok(Task {
                id: row.text("id")?,
                organization_id: row.text("organization_id")?,
                name: row.text("name")?,
                description: row.optional("description")?,
                assignee_id: row.optional("assignee_id")?,
                created_by_id: row.text("created_by_id")?,
                is_completed: row.parsed("is_completed")?,
                completed_at: row.optional_timestamp("completed_at")?,
                completed_by_id: row.optional("completed_by_id")?,
                priority: row.variant("priority", Priority::parse)?,
                due_date: row.optional_date("due_date")?,
                is_milestone: row.parsed("is_milestone")?,
                estimated_hours: row.optional_parsed("estimated_hours")?,
                num_likes: row.parsed("num_likes")?,
                created_at: row.timestamp("created_at")?,
                updated_at: row.timestamp("updated_at")?,
            })
        })?,
        task_projects: load_table(dir, |row| {
            Ok(TaskProject {
                id: row.text("id")?,
                task_id: row.text("task_id")?,
                project_id: row.text("project_id")?,
                section_id: row.text("section_id")?,
                position: row.parsed("position")?,
                added_at: row.timestamp("added_at")?,
            })
        })?,
        task_dependencies: load_table(dir, |row| {
            Ok(TaskDependency {
                id: row.text("id")?,
                blocking_task_id: row.text("blocking_task_id")?,
                blocked_task_id: row.text("blocked_task_id")?,
                created_at: row.timestamp("created_at")?,
            })
        })?,
    })
}
