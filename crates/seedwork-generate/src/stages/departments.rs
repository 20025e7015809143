use seedwork_core::{Department, Organization, WorkflowType};

use super::StageContext;
use crate::errors::GenerationError;

/// Department layout shared by every organization; shares sum to 1.0.
pub const DEPARTMENT_LAYOUT: [(&str, f64, WorkflowType); 4] = [
    ("Product Engineering", 0.40, WorkflowType::SprintBased),
    ("Marketing", 0.15, WorkflowType::CampaignBased),
    ("Sales/HR/Customer Success", 0.35, WorkflowType::ProcessDriven),
    ("Upper Management", 0.10, WorkflowType::Oversight),
];

pub fn generate(
    ctx: &mut StageContext<'_>,
    organizations: &[Organization],
) -> Result<Vec<Department>, GenerationError> {
    let mut departments = Vec::with_capacity(organizations.len() * DEPARTMENT_LAYOUT.len());

    for organization in organizations {
        for (name, share, workflow_type) in DEPARTMENT_LAYOUT {
            departments.push(Department {
                id: ctx.next_id(),
                organization_id: organization.id.clone(),
                name: name.to_string(),
                description: description(name, workflow_type),
                user_percentage: share,
                workflow_type,
                created_at: organization.created_at,
            });
        }
    }

    Ok(departments)
}

fn description(name: &str, workflow_type: WorkflowType) -> String {
    format!(
        "{name} handles {} workflows.",
        workflow_type.as_str().replace('_', " ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_shares_sum_to_one() {
        let total: f64 = DEPARTMENT_LAYOUT.iter().map(|(_, share, _)| share).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn description_names_the_workflow() {
        assert_eq!(
            description("Marketing", WorkflowType::CampaignBased),
            "Marketing handles campaign based workflows."
        );
    }
}
