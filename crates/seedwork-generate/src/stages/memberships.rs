use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};

use seedwork_core::{MembershipRole, Team, TeamMembership, User};

use super::{StageContext, resolve};
use crate::errors::GenerationError;
use crate::sampler::{pick_weighted, primary_and_secondary};
use crate::temporal::pick_after;

const ROLE_WEIGHTS: [(MembershipRole, f64); 3] = [
    (MembershipRole::Member, 0.80),
    (MembershipRole::Lead, 0.15),
    (MembershipRole::Admin, 0.05),
];

const PRIMARY_JOIN: (i64, i64) = (1, 720);
const SECONDARY_JOIN: (i64, i64) = (24, 720);

pub fn generate(
    ctx: &mut StageContext<'_>,
    users: &[User],
    teams: &[Team],
) -> Result<Vec<TeamMembership>, GenerationError> {
    let mut by_department: BTreeMap<&str, Vec<&Team>> = BTreeMap::new();
    for team in teams {
        by_department
            .entry(team.department_id.as_str())
            .or_default()
            .push(team);
    }

    let mut memberships = Vec::with_capacity(users.len());
    for user in users {
        let candidates = by_department
            .get(user.department_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let (primary, secondary) =
            primary_and_secondary(candidates, ctx.config.secondary_team_rate, &mut ctx.rng)
                .map_err(|_| GenerationError::EmptyPool {
                    pool: format!("teams of department {}", user.department_id),
                })?;

        let role = if user.is_manager {
            MembershipRole::Lead
        } else {
            *pick_weighted(&ROLE_WEIGHTS, &mut ctx.rng)?
        };
        memberships.push(join(ctx, user, primary, role, true, PRIMARY_JOIN)?);

        if let Some(secondary) = secondary {
            memberships.push(join(ctx, user, secondary, MembershipRole::Member, false, SECONDARY_JOIN)?);
        }
    }

    Ok(memberships)
}

fn join(
    ctx: &mut StageContext<'_>,
    user: &User,
    team: &Team,
    role: MembershipRole,
    is_primary_team: bool,
    (min_hours, max_hours): (i64, i64),
) -> Result<TeamMembership, GenerationError> {
    let id = ctx.next_id();
    let now = ctx.anchors.now;
    let anchor = user.created_at.max(team.created_at);

    let sampled = pick_after(
        anchor,
        Duration::hours(min_hours),
        Duration::hours(max_hours),
        now,
        &mut ctx.rng,
    );
    let joined_at = resolve(
        ctx.report,
        "team_membership",
        &id,
        sampled,
        || anchor,
        |joined| check_joined(*joined, anchor, now),
    )?;

    Ok(TeamMembership {
        id,
        team_id: team.id.clone(),
        user_id: user.id.clone(),
        role,
        is_primary_team,
        joined_at,
    })
}

fn check_joined(joined: NaiveDateTime, anchor: NaiveDateTime, now: NaiveDateTime) -> Result<(), String> {
    if joined < anchor {
        return Err("joined before the user or team existed".to_string());
    }
    if joined > now {
        return Err("joined in the future".to_string());
    }
    Ok(())
}
