use std::collections::BTreeMap;

use chrono::Duration;

use seedwork_core::{Department, Organization, Team, User};

use super::{StageContext, resolve};
use crate::errors::GenerationError;
use crate::temporal::{Bias, pick_timestamp};

/// Roughly one team per this many department members.
const USERS_PER_TEAM: usize = 6;

fn base_names(department: &str) -> &'static [&'static str] {
    match department {
        "Marketing" => &[
            "Content",
            "Demand Gen",
            "Product Marketing",
            "Brand",
            "Events",
            "Growth",
        ],
        "Sales/HR/Customer Success" => &[
            "Enterprise Sales",
            "SMB Sales",
            "Customer Success",
            "Support",
            "Recruiting",
            "People Ops",
        ],
        "Upper Management" => &["Executive", "Strategy", "Operations", "Finance"],
        _ => &[
            "Backend",
            "Frontend",
            "Mobile",
            "Platform",
            "Infrastructure",
            "DevOps",
            "Security",
            "QA",
            "Data",
            "ML/AI",
        ],
    }
}

/// `"Backend Team"` for the first pass over the base names, then
/// `"Backend Team 2"`, `"Backend Team 3"` and so on.
pub fn team_name(department: &str, index: usize) -> String {
    let bases = base_names(department);
    let base = team_base(department, index);
    let round = index / bases.len();
    if round == 0 {
        format!("{base} Team")
    } else {
        format!("{base} Team {}", round + 1)
    }
}

fn team_base(department: &str, index: usize) -> &'static str {
    let bases = base_names(department);
    bases[index % bases.len()]
}

pub fn generate(
    ctx: &mut StageContext<'_>,
    organizations: &[Organization],
    departments: &[Department],
    users: &[User],
) -> Result<Vec<Team>, GenerationError> {
    let now = ctx.anchors.now;
    let organizations: BTreeMap<&str, &Organization> = organizations
        .iter()
        .map(|organization| (organization.id.as_str(), organization))
        .collect();

    let mut headcount: BTreeMap<&str, usize> = BTreeMap::new();
    for user in users {
        *headcount.entry(user.department_id.as_str()).or_default() += 1;
    }

    let mut teams = Vec::new();
    for department in departments {
        let members = headcount.get(department.id.as_str()).copied().unwrap_or(0);
        if members == 0 {
            continue;
        }
        let organization = organizations
            .get(department.organization_id.as_str())
            .ok_or_else(|| GenerationError::ConstraintViolation {
                entity: "department",
                id: department.id.clone(),
                message: "organization missing".to_string(),
            })?;

        for index in 0..(members / USERS_PER_TEAM).max(1) {
            let id = ctx.next_id();
            let floor = organization.created_at;
            let sampled = pick_timestamp(floor + Duration::days(1), now, &Bias::Uniform, &mut ctx.rng);
            let created_at = resolve(
                ctx.report,
                "team",
                &id,
                sampled,
                || floor.min(now),
                |created| {
                    if *created < floor || *created > now {
                        Err("created_at outside [organization.created_at, now]".to_string())
                    } else {
                        Ok(())
                    }
                },
            )?;

            teams.push(Team {
                id,
                department_id: department.id.clone(),
                organization_id: organization.id.clone(),
                name: team_name(&department.name, index),
                description: format!(
                    "The {} team within {}.",
                    team_base(&department.name, index),
                    department.name
                ),
                created_at,
            });
        }
    }

    Ok(teams)
}
