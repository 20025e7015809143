use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::Rng;
use rand::seq::IndexedRandom;

use seedwork_core::{Project, ProjectType, Section, Team, User};

use super::{StageContext, resolve};
use crate::errors::GenerationError;
use crate::model::GenerationReport;
use crate::sampler::{CandidatePool, SelectionRule, select_required};
use crate::temporal::{Bias, pick_timestamp, start_of_day};

const SPRINT_DAYS: i64 = 14;
const MAX_PROJECT_DAYS: i64 = 90;
const ARCHIVED_RATE: f64 = 0.30;
const PUBLIC_RATE: f64 = 0.90;
const COLORS: [&str; 4] = ["dark-blue", "dark-green", "dark-purple", "dark-orange"];

/// Projects plus the board sections created with them.
#[derive(Debug, Default)]
pub struct ProjectsOutput {
    pub projects: Vec<Project>,
    pub sections: Vec<Section>,
}

pub fn generate(
    ctx: &mut StageContext<'_>,
    users: &[User],
    teams: &[Team],
) -> Result<ProjectsOutput, GenerationError> {
    let now = ctx.anchors.now;
    let history_start = ctx.anchors.history_start;

    let mut org_users: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut org_managers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for user in users {
        org_users
            .entry(user.organization_id.as_str())
            .or_default()
            .push(user.id.as_str());
        if user.is_manager {
            org_managers
                .entry(user.organization_id.as_str())
                .or_default()
                .push(user.id.as_str());
        }
    }

    let creator_rule = SelectionRule::prefer("managers", 1.0);
    let mut output = ProjectsOutput::default();

    for team in teams {
        let organization = team.organization_id.as_str();
        let pool = CandidatePool::new()
            .with_group(
                "managers",
                org_managers.get(organization).cloned().unwrap_or_default(),
            )
            .with_fallback(org_users.get(organization).cloned().unwrap_or_default());

        let count = ctx.rng.random_range(2..=4);
        for index in 0..count {
            let id = ctx.next_id();
            let project_type = *ProjectType::ALL
                .choose(&mut ctx.rng)
                .unwrap_or(&ProjectType::Sprint);
            let name = project_name(ctx, project_type, index)?;
            let created_by_id = select_required(&pool, &creator_rule, &mut ctx.rng)?.to_string();

            let earliest = team.created_at.max(history_start);
            let sampled = pick_timestamp(earliest, now, &Bias::Uniform, &mut ctx.rng);
            let floor = team.created_at;
            let created_at = resolve(
                ctx.report,
                "project",
                &id,
                sampled,
                || earliest.min(now),
                |created| {
                    if *created < floor || *created > now {
                        Err("created_at outside [team.created_at, now]".to_string())
                    } else {
                        Ok(())
                    }
                },
            )?;

            let start_date = created_at.date();
            let due_date = if project_type == ProjectType::Sprint
                && ctx.rng.random_bool(ctx.config.two_week_sprint_rate)
            {
                start_date + Duration::days(SPRINT_DAYS)
            } else {
                start_date + Duration::days(ctx.rng.random_range(SPRINT_DAYS..=MAX_PROJECT_DAYS))
            };

            let updated_at =
                sample_updated_at(ctx.report, &id, created_at, due_date, now, &mut ctx.rng)?;
            let color = COLORS.choose(&mut ctx.rng).copied().unwrap_or(COLORS[0]);
            let is_archived = ctx.rng.random_bool(ARCHIVED_RATE);
            let is_public = ctx.rng.random_bool(PUBLIC_RATE);

            for (position, section) in project_type.board().sections.iter().enumerate() {
                output.sections.push(Section {
                    id: ctx.next_id(),
                    project_id: id.clone(),
                    name: section.to_string(),
                    position: position as u32,
                    created_at,
                });
            }

            output.projects.push(Project {
                id,
                team_id: team.id.clone(),
                organization_id: team.organization_id.clone(),
                description: format!("Project: {name}"),
                name,
                color: color.to_string(),
                is_archived,
                is_public,
                project_type,
                created_by_id,
                start_date,
                due_date,
                created_at,
                updated_at,
            });
        }
    }

    Ok(output)
}

/// Uniform in `[created_at, min(due_date 00:00, now)]`; a window that closes
/// before `created_at` collapses to `created_at`.
pub fn sample_updated_at<R: Rng + ?Sized>(
    report: &mut GenerationReport,
    id: &str,
    created_at: NaiveDateTime,
    due_date: NaiveDate,
    now: NaiveDateTime,
    rng: &mut R,
) -> Result<NaiveDateTime, GenerationError> {
    let latest = start_of_day(due_date).min(now);
    let sampled = pick_timestamp(created_at, latest, &Bias::Uniform, rng);
    resolve(
        report,
        "project",
        id,
        sampled,
        || created_at,
        |updated| {
            if *updated < created_at {
                return Err("updated_at before created_at".to_string());
            }
            if *updated > now {
                return Err("updated_at in the future".to_string());
            }
            if *updated > latest && *updated != created_at {
                return Err("updated_at after the due date".to_string());
            }
            Ok(())
        },
    )
}

fn project_name(
    ctx: &mut StageContext<'_>,
    project_type: ProjectType,
    index: usize,
) -> Result<String, GenerationError> {
    let template = ctx
        .content
        .weighted_choice(&format!("project.{}", project_type.as_str()), &mut ctx.rng)?;
    Ok(template
        .replace("{quarter}", &((index % 4) + 1).to_string())
        .replace("{num}", &(40 + (index % 15)).to_string()))
}
