use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of work a project tracks; drives naming, board layout and completion rates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Sprint,
    Campaign,
    Process,
    CrossFunctional,
    Oversight,
}

impl ProjectType {
    pub const ALL: [ProjectType; 5] = [
        ProjectType::Sprint,
        ProjectType::Campaign,
        ProjectType::Process,
        ProjectType::CrossFunctional,
        ProjectType::Oversight,
    ];

    /// Inverse of [`ProjectType::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sprint" => Some(ProjectType::Sprint),
            "campaign" => Some(ProjectType::Campaign),
            "process" => Some(ProjectType::Process),
            "cross_functional" => Some(ProjectType::CrossFunctional),
            "oversight" => Some(ProjectType::Oversight),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Sprint => "sprint",
            ProjectType::Campaign => "campaign",
            ProjectType::Process => "process",
            ProjectType::CrossFunctional => "cross_functional",
            ProjectType::Oversight => "oversight",
        }
    }

    /// Board layout new projects of this type start with.
    pub fn board(self) -> &'static BoardTemplate {
        match self {
            ProjectType::Sprint => &SPRINT_BOARD,
            ProjectType::Campaign => &CAMPAIGN_BOARD,
            ProjectType::Process => &SALES_PIPELINE_BOARD,
            ProjectType::CrossFunctional => &PRODUCT_LAUNCH_BOARD,
            ProjectType::Oversight => &KANBAN_BOARD,
        }
    }
}

/// Ordered section names for a project board plus the section that holds
/// finished work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardTemplate {
    pub name: &'static str,
    pub sections: &'static [&'static str],
    pub done: &'static str,
}

impl BoardTemplate {
    /// Sections open work can sit in.
    pub fn open_sections(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sections.iter().copied().filter(|name| *name != self.done)
    }
}

pub const SPRINT_BOARD: BoardTemplate = BoardTemplate {
    name: "sprint",
    sections: &["Backlog", "To Do", "In Progress", "In Review", "Done"],
    done: "Done",
};

pub const KANBAN_BOARD: BoardTemplate = BoardTemplate {
    name: "kanban",
    sections: &["Backlog", "Ready", "In Development", "Code Review", "QA", "Done"],
    done: "Done",
};

pub const CAMPAIGN_BOARD: BoardTemplate = BoardTemplate {
    name: "campaign",
    sections: &[
        "Planning",
        "Content Creation",
        "Design",
        "Review & Approval",
        "Ready to Launch",
        "Live",
        "Complete",
    ],
    done: "Complete",
};

pub const SALES_PIPELINE_BOARD: BoardTemplate = BoardTemplate {
    name: "sales_pipeline",
    sections: &[
        "New Lead",
        "Qualified",
        "Discovery",
        "Proposal",
        "Negotiation",
        "Closed Won",
        "Closed Lost",
    ],
    done: "Closed Won",
};

pub const PRODUCT_LAUNCH_BOARD: BoardTemplate = BoardTemplate {
    name: "product_launch",
    sections: &[
        "Pre-Launch",
        "Development",
        "Testing",
        "Marketing Prep",
        "Launch Ready",
        "Launched",
        "Post-Launch",
    ],
    done: "Launched",
};

/// How a department organizes its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    SprintBased,
    CampaignBased,
    ProcessDriven,
    Oversight,
}

impl WorkflowType {
    /// Inverse of [`WorkflowType::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sprint_based" => Some(WorkflowType::SprintBased),
            "campaign_based" => Some(WorkflowType::CampaignBased),
            "process_driven" => Some(WorkflowType::ProcessDriven),
            "oversight" => Some(WorkflowType::Oversight),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowType::SprintBased => "sprint_based",
            WorkflowType::CampaignBased => "campaign_based",
            WorkflowType::ProcessDriven => "process_driven",
            WorkflowType::Oversight => "oversight",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    Member,
    Lead,
    Admin,
}

impl MembershipRole {
    /// Inverse of [`MembershipRole::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "member" => Some(MembershipRole::Member),
            "lead" => Some(MembershipRole::Lead),
            "admin" => Some(MembershipRole::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MembershipRole::Member => "member",
            MembershipRole::Lead => "lead",
            MembershipRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Inverse of [`Priority::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub description: String,
    /// Share of the organization's users placed in this department (0..=1).
    pub user_percentage: f64,
    pub workflow_type: WorkflowType,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub organization_id: String,
    pub department_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub job_title: String,
    pub is_manager: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub last_active_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub department_id: String,
    pub organization_id: String,
    pub name: String,
    pub description: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMembership {
    pub id: String,
    pub team_id: String,
    pub user_id: String,
    pub role: MembershipRole,
    pub is_primary_team: bool,
    pub joined_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub team_id: String,
    pub organization_id: String,
    pub name: String,
    pub description: String,
    /// Board color label, e.g. `dark-blue`.
    pub color: String,
    pub is_archived: bool,
    pub is_public: bool,
    pub project_type: ProjectType,
    pub created_by_id: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Board column inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub position: u32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub description: Option<String>,
    pub assignee_id: Option<String>,
    pub created_by_id: String,
    pub is_completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub completed_by_id: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub is_milestone: bool,
    pub estimated_hours: Option<u32>,
    pub num_likes: u32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Places a task on a project board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProject {
    pub id: String,
    pub task_id: String,
    pub project_id: String,
    pub section_id: String,
    pub position: u32,
    pub added_at: NaiveDateTime,
}

/// `blocking_task_id` must finish before `blocked_task_id` can start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: String,
    pub blocking_task_id: String,
    pub blocked_task_id: String,
    pub created_at: NaiveDateTime,
}
