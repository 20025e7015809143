use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::Rng;
use rand::seq::IndexedRandom;

use seedwork_core::{Priority, Project, ProjectType, Section, Task, TaskProject, TeamMembership, User};

use super::{StageContext, resolve};
use crate::errors::GenerationError;
use crate::sampler::{CandidatePool, SelectionRule, pick_weighted, select, select_required};
use crate::temporal::{Bias, avoid_weekend, pick_timestamp, sprint_end};

const PRIORITY_WEIGHTS: [(Priority, f64); 4] = [
    (Priority::Low, 0.20),
    (Priority::Medium, 0.45),
    (Priority::High, 0.25),
    (Priority::Urgent, 0.10),
];

const OPEN_UPDATE_WINDOW_DAYS: i64 = 30;
const WEEKEND_AVOIDANCE: f64 = 0.85;
const SPRINT_ALIGNMENT: f64 = 0.70;
const SPRINT_DAYS: i64 = 14;
const MILESTONE_RATE: f64 = 0.03;
const ESTIMATE_RATE: f64 = 0.30;
const ESTIMATED_HOURS: [Option<u32>; 4] = [None, Some(2), Some(4), Some(8)];
const LIKE_WEIGHTS: [(u32, f64); 4] = [(0, 0.70), (1, 0.15), (2, 0.10), (3, 0.05)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DescriptionKind {
    None,
    Brief,
    AcceptanceCriteria,
}

const DESCRIPTION_KINDS: [(DescriptionKind, f64); 3] = [
    (DescriptionKind::None, 0.20),
    (DescriptionKind::Brief, 0.50),
    (DescriptionKind::AcceptanceCriteria, 0.30),
];

const BRIEF_DESCRIPTIONS: [&str; 3] = [
    "Complete per sprint goals.",
    "High priority.",
    "See docs for details.",
];

const ACCEPTANCE_CRITERIA: &str =
    "Complete this task.\n\n**Acceptance Criteria:**\n- [ ] Functionality works\n- [ ] Tests pass";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DueBucket {
    None,
    Overdue,
    WithinWeek,
    WithinMonth,
    WithinQuarter,
}

const DUE_BUCKETS: [(DueBucket, f64); 5] = [
    (DueBucket::None, 0.10),
    (DueBucket::Overdue, 0.05),
    (DueBucket::WithinWeek, 0.25),
    (DueBucket::WithinMonth, 0.40),
    (DueBucket::WithinQuarter, 0.20),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Feature,
    Bug,
    Refactor,
    Marketing,
    Sales,
}

const NAME_KINDS: [(NameKind, f64); 5] = [
    (NameKind::Feature, 0.35),
    (NameKind::Bug, 0.25),
    (NameKind::Refactor, 0.15),
    (NameKind::Marketing, 0.15),
    (NameKind::Sales, 0.10),
];

/// Tasks plus their placement on project boards, in the same order.
#[derive(Debug, Default)]
pub struct TasksOutput {
    pub tasks: Vec<Task>,
    pub task_projects: Vec<TaskProject>,
}

struct Board<'s> {
    done: &'s str,
    open: Vec<&'s str>,
}

pub fn generate(
    ctx: &mut StageContext<'_>,
    users: &[User],
    memberships: &[TeamMembership],
    projects: &[Project],
    sections: &[Section],
) -> Result<TasksOutput, GenerationError> {
    let total = ctx.config.total_tasks() as usize;
    if projects.is_empty() {
        if total == 0 {
            return Ok(TasksOutput::default());
        }
        return Err(GenerationError::EmptyPool {
            pool: "projects".to_string(),
        });
    }

    let pools = team_pools(users, memberships, projects);
    let boards = boards(projects, sections)?;
    let assignee_rule = SelectionRule::prefer("non_managers", ctx.config.non_manager_assignee_rate)
        .otherwise("managers")
        .unassigned(ctx.config.unassigned_rate);
    let managers_rule = SelectionRule::prefer("managers", 1.0);
    let now = ctx.anchors.now;

    let mut positions: BTreeMap<&str, u32> = BTreeMap::new();
    let mut output = TasksOutput {
        tasks: Vec::with_capacity(total),
        task_projects: Vec::with_capacity(total),
    };

    for _ in 0..total {
        let project = projects
            .choose(&mut ctx.rng)
            .ok_or_else(|| GenerationError::EmptyPool {
                pool: "projects".to_string(),
            })?;
        let pool = pools
            .get(project.team_id.as_str())
            .ok_or_else(|| GenerationError::EmptyPool {
                pool: format!("users of team {}", project.team_id),
            })?;
        let id = ctx.next_id();

        let assignee = select(pool, &assignee_rule, &mut ctx.rng)?;
        let creator = if ctx.rng.random_bool(ctx.config.manager_creator_rate) {
            select_required(pool, &managers_rule, &mut ctx.rng)?
        } else {
            match assignee {
                Some(assignee) => assignee,
                None => pool.any(&mut ctx.rng)?,
            }
        };

        let name = task_name(ctx)?;
        let created_at = pick_timestamp(
            project.created_at,
            now,
            &Bias::DayOfWeek(ctx.config.day_weights),
            &mut ctx.rng,
        )?;

        let range = ctx.config.completion_range(project.project_type);
        let completion_rate = if range.max > range.min {
            ctx.rng.random_range(range.min..=range.max)
        } else {
            range.min
        };
        let mut is_completed = ctx.rng.random::<f64>() < completion_rate;
        if is_completed && created_at >= now {
            ctx.report.record_downgraded_completion();
            is_completed = false;
        }

        let completed_at = if is_completed {
            let sampled = pick_timestamp(created_at, now, &Bias::completion_latency(), &mut ctx.rng);
            Some(resolve(
                ctx.report,
                "task",
                &id,
                sampled,
                || now,
                |completed| {
                    if *completed <= created_at || *completed > now {
                        Err("completed_at outside (created_at, now]".to_string())
                    } else {
                        Ok(())
                    }
                },
            )?)
        } else {
            None
        };

        let updated_at = match completed_at {
            Some(completed_at) => completed_at,
            None => {
                let latest = (created_at + Duration::days(OPEN_UPDATE_WINDOW_DAYS)).min(now);
                pick_timestamp(created_at, latest, &Bias::Uniform, &mut ctx.rng)?
            }
        };

        let due_date = due_date(ctx, created_at, project)?;
        let priority = *pick_weighted(&PRIORITY_WEIGHTS, &mut ctx.rng)?;
        let description = description(&mut ctx.rng)?;
        let is_milestone = ctx.rng.random_bool(MILESTONE_RATE);
        let estimated_hours = if ctx.rng.random_bool(ESTIMATE_RATE) {
            ESTIMATED_HOURS.choose(&mut ctx.rng).copied().flatten()
        } else {
            None
        };
        let num_likes = *pick_weighted(&LIKE_WEIGHTS, &mut ctx.rng)?;

        let board = boards
            .get(project.id.as_str())
            .ok_or_else(|| GenerationError::EmptyPool {
                pool: format!("sections of project {}", project.id),
            })?;
        let section_id = if is_completed {
            board.done
        } else {
            board.open.choose(&mut ctx.rng).copied().unwrap_or(board.done)
        };
        let position = positions.entry(project.id.as_str()).or_insert(0);

        output.task_projects.push(TaskProject {
            id: ctx.next_id(),
            task_id: id.clone(),
            project_id: project.id.clone(),
            section_id: section_id.to_string(),
            position: *position,
            added_at: created_at,
        });
        *position += 1;

        output.tasks.push(Task {
            id,
            organization_id: project.organization_id.clone(),
            name,
            description,
            assignee_id: assignee.map(str::to_string),
            created_by_id: creator.to_string(),
            is_completed,
            completed_at,
            completed_by_id: completed_at.map(|_| assignee.unwrap_or(creator).to_string()),
            priority,
            due_date,
            is_milestone,
            estimated_hours,
            num_likes,
            created_at,
            updated_at,
        });
    }

    Ok(output)
}

/// Per team: organization managers, the team's non-manager members (or the
/// organization's when the team has none) and every organization user as
/// fallback.
fn team_pools<'a>(
    users: &'a [User],
    memberships: &[TeamMembership],
    projects: &'a [Project],
) -> BTreeMap<&'a str, CandidatePool<'a>> {
    let by_id: BTreeMap<&str, &'a User> =
        users.iter().map(|user| (user.id.as_str(), user)).collect();

    let mut org_users: BTreeMap<&str, Vec<&'a str>> = BTreeMap::new();
    let mut org_managers: BTreeMap<&str, Vec<&'a str>> = BTreeMap::new();
    let mut org_non_managers: BTreeMap<&str, Vec<&'a str>> = BTreeMap::new();
    for user in users {
        let org = user.organization_id.as_str();
        org_users.entry(org).or_default().push(user.id.as_str());
        let bucket = if user.is_manager {
            &mut org_managers
        } else {
            &mut org_non_managers
        };
        bucket.entry(org).or_default().push(user.id.as_str());
    }

    let mut team_non_managers: BTreeMap<&str, BTreeSet<&'a str>> = BTreeMap::new();
    for membership in memberships {
        if let Some(user) = by_id.get(membership.user_id.as_str()).copied()
            && !user.is_manager
        {
            team_non_managers
                .entry(membership.team_id.as_str())
                .or_default()
                .insert(user.id.as_str());
        }
    }

    let mut pools = BTreeMap::new();
    for project in projects {
        let team = project.team_id.as_str();
        if pools.contains_key(team) {
            continue;
        }
        let org = project.organization_id.as_str();
        let non_managers: Vec<&'a str> = match team_non_managers.get(team) {
            Some(members) if !members.is_empty() => members.iter().copied().collect(),
            _ => org_non_managers.get(org).cloned().unwrap_or_default(),
        };
        let pool = CandidatePool::new()
            .with_group("managers", org_managers.get(org).cloned().unwrap_or_default())
            .with_group("non_managers", non_managers)
            .with_fallback(org_users.get(org).cloned().unwrap_or_default());
        pools.insert(team, pool);
    }
    pools
}

fn boards<'s>(
    projects: &[Project],
    sections: &'s [Section],
) -> Result<BTreeMap<&'s str, Board<'s>>, GenerationError> {
    let mut by_project: BTreeMap<&'s str, Vec<&'s Section>> = BTreeMap::new();
    for section in sections {
        by_project
            .entry(section.project_id.as_str())
            .or_default()
            .push(section);
    }

    let mut boards = BTreeMap::new();
    for project in projects {
        let Some((key, project_sections)) = by_project.get_key_value(project.id.as_str()) else {
            continue;
        };
        let template = project.project_type.board();
        let done = project_sections
            .iter()
            .copied()
            .find(|section| section.name == template.done)
            .ok_or_else(|| GenerationError::EmptyPool {
                pool: format!("done section of project {}", project.id),
            })?;
        let open = project_sections
            .iter()
            .copied()
            .filter(|section| section.name != template.done)
            .map(|section| section.id.as_str())
            .collect();
        boards.insert(
            *key,
            Board {
                done: done.id.as_str(),
                open,
            },
        );
    }
    Ok(boards)
}

fn due_date(
    ctx: &mut StageContext<'_>,
    created_at: NaiveDateTime,
    project: &Project,
) -> Result<Option<NaiveDate>, GenerationError> {
    let created = created_at.date();
    let mut due = match *pick_weighted(&DUE_BUCKETS, &mut ctx.rng)? {
        DueBucket::None => return Ok(None),
        DueBucket::Overdue => created - Duration::days(ctx.rng.random_range(1..=14)),
        DueBucket::WithinWeek => created + Duration::days(ctx.rng.random_range(1..=7)),
        DueBucket::WithinMonth => created + Duration::days(ctx.rng.random_range(8..=30)),
        DueBucket::WithinQuarter => created + Duration::days(ctx.rng.random_range(31..=90)),
    };
    if due > created {
        due = avoid_weekend(due, WEEKEND_AVOIDANCE, &mut ctx.rng);
    }
    if project.project_type == ProjectType::Sprint && ctx.rng.random_bool(SPRINT_ALIGNMENT) {
        due = sprint_end(due, SPRINT_DAYS);
    }
    Ok(Some(due.min(project.due_date)))
}

fn description<R: Rng + ?Sized>(rng: &mut R) -> Result<Option<String>, GenerationError> {
    let text = match *pick_weighted(&DESCRIPTION_KINDS, rng)? {
        DescriptionKind::None => return Ok(None),
        DescriptionKind::Brief => BRIEF_DESCRIPTIONS
            .choose(rng)
            .copied()
            .unwrap_or(BRIEF_DESCRIPTIONS[0]),
        DescriptionKind::AcceptanceCriteria => ACCEPTANCE_CRITERIA,
    };
    Ok(Some(text.to_string()))
}

fn task_name(ctx: &mut StageContext<'_>) -> Result<String, GenerationError> {
    let content = ctx.content;
    let rng = &mut ctx.rng;
    let name = match *pick_weighted(&NAME_KINDS, rng)? {
        NameKind::Feature => format!(
            "Implement {} for {}",
            content.weighted_choice("feature", rng)?,
            content.weighted_choice("component", rng)?
        ),
        NameKind::Bug => format!(
            "[Bug]: {} {}",
            content.weighted_choice("component", rng)?,
            content.weighted_choice("error", rng)?
        ),
        NameKind::Refactor => {
            let component = content.weighted_choice("component", rng)?;
            match rng.random_range(0..3) {
                0 => format!("Refactor {component}"),
                1 => format!(
                    "Refactor {component} for better {}",
                    content.weighted_choice("quality", rng)?
                ),
                _ => format!(
                    "Migrate {component} to {}",
                    content.weighted_choice("technology", rng)?
                ),
            }
        }
        NameKind::Marketing => format!(
            "Write {} for Q{} campaign",
            content.weighted_choice("deliverable", rng)?,
            rng.random_range(1..=4)
        ),
        NameKind::Sales => format!("Follow up with {}", content.weighted_choice("client", rng)?),
    };
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CuratedContent;
    use crate::model::GenerationReport;
    use crate::stages::TimeAnchors;
    use rand::SeedableRng;
    use seedwork_core::{GenerationConfig, Stage};

    fn ts(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn sprint_project(due_date: NaiveDate) -> Project {
        Project {
            id: "p".to_string(),
            team_id: "t".to_string(),
            organization_id: "o".to_string(),
            name: "Sprint 40 - Engineering".to_string(),
            description: "Project: Sprint 40 - Engineering".to_string(),
            color: "dark-blue".to_string(),
            is_archived: false,
            is_public: true,
            project_type: ProjectType::Sprint,
            created_by_id: "u".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            due_date,
            created_at: ts("2024-06-01 10:00:00"),
            updated_at: ts("2024-06-01 10:00:00"),
        }
    }

    #[test]
    fn due_dates_are_capped_by_the_project() {
        let now = ts("2024-06-30 12:00:00");
        let config = GenerationConfig::default();
        let content = CuratedContent::builtin().unwrap();
        let mut report = GenerationReport::new("test".to_string(), 5, now);
        let mut ctx = StageContext::new(
            Stage::Tasks,
            5,
            &config,
            &content,
            TimeAnchors::new(now, 6).unwrap(),
            &mut report,
        );
        let project_due = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let project = sprint_project(project_due);

        let mut missing = 0;
        for _ in 0..2_000 {
            match due_date(&mut ctx, ts("2024-06-05 09:00:00"), &project).unwrap() {
                Some(due) => assert!(due <= project_due, "{due}"),
                None => missing += 1,
            }
        }
        let rate = missing as f64 / 2_000.0;
        assert!((rate - 0.10).abs() < 0.03, "rate = {rate}");
    }

    #[test]
    fn descriptions_mix_empty_brief_and_criteria() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(11);
        let draws = 5_000;
        let mut empty = 0;
        let mut criteria = 0;
        for _ in 0..draws {
            match description(&mut rng).unwrap() {
                None => empty += 1,
                Some(text) if text.contains("**Acceptance Criteria:**") => criteria += 1,
                Some(text) => assert!(BRIEF_DESCRIPTIONS.contains(&text.as_str()), "{text}"),
            }
        }
        let empty_rate = empty as f64 / draws as f64;
        let criteria_rate = criteria as f64 / draws as f64;
        assert!((empty_rate - 0.20).abs() < 0.03, "empty = {empty_rate}");
        assert!((criteria_rate - 0.30).abs() < 0.03, "criteria = {criteria_rate}");
    }

    #[test]
    fn task_names_follow_known_shapes() {
        let now = ts("2024-06-30 12:00:00");
        let config = GenerationConfig::default();
        let content = CuratedContent::builtin().unwrap();
        let mut report = GenerationReport::new("test".to_string(), 9, now);
        let mut ctx = StageContext::new(
            Stage::Tasks,
            9,
            &config,
            &content,
            TimeAnchors::new(now, 6).unwrap(),
            &mut report,
        );

        let mut quality = 0;
        let mut migrations = 0;
        for _ in 0..600 {
            let name = task_name(&mut ctx).unwrap();
            assert!(
                name.starts_with("Implement ")
                    || name.starts_with("[Bug]: ")
                    || name.starts_with("Refactor ")
                    || name.starts_with("Migrate ")
                    || name.starts_with("Write ")
                    || name.starts_with("Follow up with "),
                "{name}"
            );
            if name.contains(" for better ") {
                quality += 1;
            }
            if name.starts_with("Migrate ") {
                migrations += 1;
                assert!(name.contains(" to "), "{name}");
            }
        }
        assert!(quality > 0);
        assert!(migrations > 0);
    }
}
