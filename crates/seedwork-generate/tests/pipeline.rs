use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDateTime};

use seedwork_core::{Batch, GenerationConfig, ProjectType, find_cycles};
use seedwork_generate::{CuratedContent, GenerationEngine, GenerationError, MemorySink};

fn reference_time() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-06-30 12:00:00", "%Y-%m-%d %H:%M:%S")
        .expect("reference time")
}

fn scenario_config() -> GenerationConfig {
    GenerationConfig {
        organizations: 2,
        users: 50,
        history_months: 2,
        tasks_per_user: 5,
        seed: Some(42),
        reference_time: Some(reference_time()),
        ..GenerationConfig::default()
    }
}

fn generate(config: GenerationConfig) -> Batch {
    let content = CuratedContent::builtin().expect("builtin content");
    let engine = GenerationEngine::new(config, &content).expect("valid config");
    let mut sink = MemorySink::new();
    let outcome = engine.run(&mut sink).expect("run generation");
    assert!(sink.is_committed());
    outcome.batch
}

fn name_triples(batch: &Batch) -> BTreeSet<(String, String, String)> {
    let organizations: BTreeMap<&str, &str> = batch
        .organizations
        .iter()
        .map(|org| (org.id.as_str(), org.name.as_str()))
        .collect();
    let departments: BTreeMap<&str, &str> = batch
        .departments
        .iter()
        .map(|department| (department.id.as_str(), department.name.as_str()))
        .collect();
    batch
        .teams
        .iter()
        .map(|team| {
            (
                organizations[team.organization_id.as_str()].to_string(),
                departments[team.department_id.as_str()].to_string(),
                team.name.clone(),
            )
        })
        .collect()
}

#[test]
fn identical_seed_produces_identical_batches() {
    let a = generate(scenario_config());
    let b = generate(scenario_config());
    assert_eq!(a, b);
    assert_eq!(name_triples(&a), name_triples(&b));
}

#[test]
fn different_seeds_diverge() {
    let a = generate(scenario_config());
    let b = generate(GenerationConfig {
        seed: Some(43),
        ..scenario_config()
    });
    assert_ne!(a.users, b.users);
}

#[test]
fn scenario_counts_match_the_config() {
    let batch = generate(scenario_config());
    assert_eq!(batch.organizations.len(), 2);
    assert_eq!(batch.departments.len(), 8);
    assert_eq!(batch.users.len(), 50);
    assert_eq!(batch.tasks.len(), 250);
    assert_eq!(batch.task_projects.len(), 250);
    assert!(!batch.teams.is_empty());
    assert!(batch.projects.len() >= 2 * batch.teams.len());
}

#[test]
fn users_live_inside_their_organization() {
    let batch = generate(scenario_config());
    let now = reference_time();
    let organizations: BTreeMap<&str, NaiveDateTime> = batch
        .organizations
        .iter()
        .map(|org| (org.id.as_str(), org.created_at))
        .collect();

    let mut emails = BTreeSet::new();
    for user in &batch.users {
        assert!(user.created_at >= organizations[user.organization_id.as_str()]);
        assert!(user.created_at <= user.last_active_at);
        assert!(user.last_active_at <= now);
        assert!(emails.insert(user.email.clone()), "duplicate {}", user.email);
    }
}

#[test]
fn every_user_has_exactly_one_primary_team() {
    let batch = generate(scenario_config());
    let mut primaries: BTreeMap<&str, usize> = BTreeMap::new();
    for membership in &batch.team_memberships {
        if membership.is_primary_team {
            *primaries.entry(membership.user_id.as_str()).or_default() += 1;
        }
    }
    for user in &batch.users {
        assert_eq!(primaries.get(user.id.as_str()), Some(&1), "user {}", user.id);
    }
}

#[test]
fn memberships_follow_users_and_teams() {
    let batch = generate(scenario_config());
    let now = reference_time();
    let users: BTreeMap<&str, NaiveDateTime> = batch
        .users
        .iter()
        .map(|user| (user.id.as_str(), user.created_at))
        .collect();
    let teams: BTreeMap<&str, NaiveDateTime> = batch
        .teams
        .iter()
        .map(|team| (team.id.as_str(), team.created_at))
        .collect();

    for membership in &batch.team_memberships {
        let anchor = users[membership.user_id.as_str()].max(teams[membership.team_id.as_str()]);
        assert!(membership.joined_at >= anchor);
        assert!(membership.joined_at <= now);
    }
}

#[test]
fn projects_respect_their_windows() {
    let batch = generate(scenario_config());
    let now = reference_time();
    let teams: BTreeMap<&str, NaiveDateTime> = batch
        .teams
        .iter()
        .map(|team| (team.id.as_str(), team.created_at))
        .collect();

    for project in &batch.projects {
        assert!(project.created_at >= teams[project.team_id.as_str()]);
        assert_eq!(project.start_date, project.created_at.date());
        assert!(project.due_date >= project.start_date);
        assert!(project.updated_at >= project.created_at);
        assert!(project.updated_at <= now);
        let due_midnight = project.due_date.and_hms_opt(0, 0, 0).expect("midnight");
        assert!(project.updated_at <= due_midnight || project.updated_at == project.created_at);
    }
}

#[test]
fn tasks_respect_their_windows() {
    let batch = generate(scenario_config());
    let now = reference_time();
    let projects: BTreeMap<&str, _> = batch
        .projects
        .iter()
        .map(|project| (project.id.as_str(), project))
        .collect();
    let placements: BTreeMap<&str, &str> = batch
        .task_projects
        .iter()
        .map(|placement| (placement.task_id.as_str(), placement.project_id.as_str()))
        .collect();

    for task in &batch.tasks {
        let project = projects[placements[task.id.as_str()]];
        assert!(task.created_at >= project.created_at);
        assert!(task.updated_at >= task.created_at);
        assert!(task.updated_at <= now);
        if let Some(due) = task.due_date {
            assert!(due <= project.due_date);
        }
        match task.completed_at {
            Some(completed_at) => {
                assert!(task.is_completed);
                assert!(completed_at > task.created_at);
                assert!(completed_at <= now);
                assert_eq!(task.updated_at, completed_at);
                assert!(task.completed_by_id.is_some());
            }
            None => {
                assert!(!task.is_completed);
                assert!(task.completed_by_id.is_none());
            }
        }
    }
}

#[test]
fn completed_tasks_sit_in_the_done_section() {
    let batch = generate(scenario_config());
    let sections: BTreeMap<&str, (&str, &str)> = batch
        .sections
        .iter()
        .map(|section| {
            (
                section.id.as_str(),
                (section.project_id.as_str(), section.name.as_str()),
            )
        })
        .collect();
    let projects: BTreeMap<&str, ProjectType> = batch
        .projects
        .iter()
        .map(|project| (project.id.as_str(), project.project_type))
        .collect();
    let tasks: BTreeMap<&str, bool> = batch
        .tasks
        .iter()
        .map(|task| (task.id.as_str(), task.is_completed))
        .collect();

    for placement in &batch.task_projects {
        let (section_project, section_name) = sections[placement.section_id.as_str()];
        assert_eq!(section_project, placement.project_id);
        let done = projects[placement.project_id.as_str()].board().done;
        assert_eq!(tasks[placement.task_id.as_str()], section_name == done);
    }
}

#[test]
fn dependencies_form_a_dag() {
    let batch = generate(GenerationConfig {
        dependency_rate: 0.5,
        ..scenario_config()
    });
    assert!(!batch.task_dependencies.is_empty());

    let created: BTreeMap<&str, NaiveDateTime> = batch
        .tasks
        .iter()
        .map(|task| (task.id.as_str(), task.created_at))
        .collect();
    for dependency in &batch.task_dependencies {
        assert_ne!(dependency.blocking_task_id, dependency.blocked_task_id);
        assert!(dependency.created_at >= created[dependency.blocking_task_id.as_str()]);
        assert!(dependency.created_at >= created[dependency.blocked_task_id.as_str()]);
    }
    assert!(find_cycles(batch.dependency_edges()).is_empty());
}

#[test]
fn large_batches_converge_on_configured_rates() {
    let batch = generate(GenerationConfig {
        organizations: 2,
        users: 2_000,
        history_months: 6,
        tasks_per_user: 6,
        seed: Some(7),
        reference_time: Some(reference_time()),
        dependency_rate: 0.0,
        ..GenerationConfig::default()
    });
    assert!(batch.tasks.len() >= 10_000);

    let unassigned = batch
        .tasks
        .iter()
        .filter(|task| task.assignee_id.is_none())
        .count();
    let rate = unassigned as f64 / batch.tasks.len() as f64;
    assert!((rate - 0.15).abs() <= 0.02, "unassigned rate {rate}");

    let sprint_projects: BTreeSet<&str> = batch
        .projects
        .iter()
        .filter(|project| project.project_type == ProjectType::Sprint)
        .map(|project| project.id.as_str())
        .collect();
    let completed: BTreeMap<&str, bool> = batch
        .tasks
        .iter()
        .map(|task| (task.id.as_str(), task.is_completed))
        .collect();
    let sprint_tasks: Vec<bool> = batch
        .task_projects
        .iter()
        .filter(|placement| sprint_projects.contains(placement.project_id.as_str()))
        .map(|placement| completed[placement.task_id.as_str()])
        .collect();
    let done = sprint_tasks.iter().filter(|done| **done).count();
    let completion = done as f64 / sprint_tasks.len() as f64;
    assert!(
        (0.68..=0.87).contains(&completion),
        "sprint completion {completion}"
    );

    let share = |count: usize, whole: usize| count as f64 / whole as f64;
    let tasks = batch.tasks.len();
    let milestones = batch.tasks.iter().filter(|task| task.is_milestone).count();
    assert!((share(milestones, tasks) - 0.03).abs() <= 0.01);
    let estimated = batch
        .tasks
        .iter()
        .filter(|task| task.estimated_hours.is_some())
        .count();
    assert!((share(estimated, tasks) - 0.225).abs() <= 0.02);
    let unliked = batch.tasks.iter().filter(|task| task.num_likes == 0).count();
    assert!((share(unliked, tasks) - 0.70).abs() <= 0.02);
    assert!(batch.tasks.iter().all(|task| task.num_likes <= 3));

    let projects = batch.projects.len();
    let archived = batch.projects.iter().filter(|project| project.is_archived).count();
    let public = batch.projects.iter().filter(|project| project.is_public).count();
    assert!((share(archived, projects) - 0.30).abs() <= 0.05, "archived");
    assert!((share(public, projects) - 0.90).abs() <= 0.04, "public");
}

#[test]
fn descriptive_columns_are_filled() {
    let batch = generate(scenario_config());
    assert!(batch.users.iter().all(|user| user.is_active));
    for department in &batch.departments {
        assert!(department.description.starts_with(&department.name));
        assert!(department.description.ends_with(" workflows."));
    }
    for team in &batch.teams {
        assert!(team.description.starts_with("The "), "{}", team.description);
    }
    for project in &batch.projects {
        assert_eq!(project.description, format!("Project: {}", project.name));
        assert!(project.color.starts_with("dark-"), "{}", project.color);
    }
}

#[test]
fn reference_time_at_the_calendar_start_fails_cleanly() {
    let config = GenerationConfig {
        reference_time: Some(NaiveDateTime::MIN + Duration::days(10)),
        ..scenario_config()
    };
    let content = CuratedContent::builtin().expect("builtin content");
    let engine = GenerationEngine::new(config, &content).expect("valid config");
    let mut sink = MemorySink::new();

    let (report, outcome) = engine.run_with_report(&mut sink);
    let err = outcome.expect_err("anchors cannot be built");
    assert!(matches!(err, GenerationError::InvalidConfig(_)));
    assert!(!sink.is_committed());
    assert_eq!(report.failure.as_deref(), Some(err.to_string().as_str()));
    assert!(report.tables.is_empty());

    let err = engine.run(&mut MemorySink::new()).unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn successful_run_reports_no_failure() {
    let content = CuratedContent::builtin().expect("builtin content");
    let engine = GenerationEngine::new(scenario_config(), &content).expect("valid config");
    let (report, outcome) = engine.run_with_report(&mut MemorySink::new());
    assert!(outcome.is_ok());
    assert!(report.failure.is_none());
    let json = serde_json::to_value(&report).expect("serialize report");
    assert!(json.get("failure").is_none());
}
