use std::collections::{BTreeMap, HashSet};

use chrono::Duration;
use rand::Rng;
use rand::seq::IndexedRandom;

use seedwork_core::{Department, Organization, User};

use super::{StageContext, resolve};
use crate::errors::GenerationError;
use crate::temporal::{Bias, pick_timestamp};

const MANAGER_ROLL: f64 = 0.20;
const MAX_TENURE_DAYS: i64 = 1_825;
const MANAGER_MARKERS: [&str; 7] = ["Manager", "Director", "VP", "CEO", "CTO", "CFO", "COO"];

fn job_titles(department: &str) -> &'static [&'static str] {
    match department {
        "Marketing" => &[
            "Marketing Manager",
            "Content Creator",
            "Growth Marketer",
            "Brand Manager",
            "Marketing Director",
        ],
        "Sales/HR/Customer Success" => &[
            "Sales Rep",
            "Account Manager",
            "HR Manager",
            "Customer Success Manager",
            "Recruiter",
        ],
        "Upper Management" => &["VP Engineering", "VP Marketing", "CEO", "CTO", "CFO", "COO"],
        _ => &[
            "Software Engineer",
            "Senior Software Engineer",
            "Staff Engineer",
            "Engineering Manager",
            "Tech Lead",
        ],
    }
}

pub fn is_managerial_title(title: &str) -> bool {
    MANAGER_MARKERS.iter().any(|marker| title.contains(marker))
}

pub fn generate(
    ctx: &mut StageContext<'_>,
    organizations: &[Organization],
    departments: &[Department],
) -> Result<Vec<User>, GenerationError> {
    let now = ctx.anchors.now;
    let per_org = apportion(
        ctx.config.users as usize,
        &vec![1.0; organizations.len()],
    );

    let mut by_org: BTreeMap<&str, Vec<&Department>> = BTreeMap::new();
    for department in departments {
        by_org
            .entry(department.organization_id.as_str())
            .or_default()
            .push(department);
    }

    let mut users = Vec::with_capacity(ctx.config.users as usize);

    for (organization, org_users) in organizations.iter().zip(per_org) {
        let org_departments = by_org
            .get(organization.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        if org_departments.is_empty() {
            return Err(GenerationError::EmptyPool {
                pool: format!("departments of {}", organization.name),
            });
        }

        let shares: Vec<f64> = org_departments
            .iter()
            .map(|department| department.user_percentage)
            .collect();
        let counts = apportion(org_users, &shares);
        let mut emails: HashSet<String> = HashSet::new();
        let tenure_end = (organization.created_at + Duration::days(MAX_TENURE_DAYS)).min(now);

        for (department, count) in org_departments.iter().zip(counts) {
            for _ in 0..count {
                let id = ctx.next_id();
                let (first_name, last_name) = ctx.content.random_person_name(&mut ctx.rng)?;
                let email = unique_email(&first_name, &last_name, &organization.domain, &mut emails);

                let job_title = job_titles(&department.name)
                    .choose(&mut ctx.rng)
                    .copied()
                    .unwrap_or("Software Engineer");
                let is_manager = is_managerial_title(job_title) || ctx.rng.random_bool(MANAGER_ROLL);

                let sampled = sample_activity(ctx, organization, tenure_end);
                let (created_at, last_active_at) = resolve(
                    ctx.report,
                    "user",
                    &id,
                    sampled,
                    || (organization.created_at, organization.created_at),
                    |(created, active)| check_activity(organization, *created, *active, now),
                )?;

                users.push(User {
                    id,
                    organization_id: organization.id.clone(),
                    department_id: department.id.clone(),
                    first_name,
                    last_name,
                    email,
                    job_title: job_title.to_string(),
                    is_manager,
                    is_active: true,
                    created_at,
                    last_active_at,
                });
            }
        }
    }

    Ok(users)
}

fn sample_activity(
    ctx: &mut StageContext<'_>,
    organization: &Organization,
    tenure_end: chrono::NaiveDateTime,
) -> Result<(chrono::NaiveDateTime, chrono::NaiveDateTime), GenerationError> {
    let created_at = pick_timestamp(
        organization.created_at,
        tenure_end,
        &Bias::Uniform,
        &mut ctx.rng,
    )?;
    let last_active_at = pick_timestamp(created_at, ctx.anchors.now, &Bias::Uniform, &mut ctx.rng)?;
    Ok((created_at, last_active_at))
}

fn check_activity(
    organization: &Organization,
    created_at: chrono::NaiveDateTime,
    last_active_at: chrono::NaiveDateTime,
    now: chrono::NaiveDateTime,
) -> Result<(), String> {
    if created_at < organization.created_at {
        return Err("created before its organization".to_string());
    }
    if last_active_at < created_at || last_active_at > now {
        return Err("last_active_at outside [created_at, now]".to_string());
    }
    Ok(())
}

/// `first.last@domain`, with a numeric suffix when the address is taken.
fn unique_email(first: &str, last: &str, domain: &str, taken: &mut HashSet<String>) -> String {
    let base = format!("{}.{}", first.to_lowercase(), last.to_lowercase());
    let mut email = format!("{base}@{domain}");
    let mut counter = 1;
    while taken.contains(&email) {
        email = format!("{base}{counter}@{domain}");
        counter += 1;
    }
    taken.insert(email.clone());
    email
}

/// Split `total` by `shares` with the largest-remainder method so the parts
/// always add up to `total`. Ties go to the earlier share.
pub fn apportion(total: usize, shares: &[f64]) -> Vec<usize> {
    if shares.is_empty() {
        return Vec::new();
    }
    let sum: f64 = shares.iter().sum();
    if sum <= 0.0 {
        let mut counts = vec![0; shares.len()];
        counts[0] = total;
        return counts;
    }

    let exact: Vec<f64> = shares
        .iter()
        .map(|share| total as f64 * share / sum)
        .collect();
    let mut counts: Vec<usize> = exact.iter().map(|value| value.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|a, b| {
        let frac_a = exact[*a] - exact[*a].floor();
        let frac_b = exact[*b] - exact[*b].floor();
        frac_b.total_cmp(&frac_a).then(a.cmp(b))
    });
    for index in order.into_iter().cycle().take(total.saturating_sub(assigned)) {
        counts[index] += 1;
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apportion_is_exact() {
        let shares = [0.40, 0.15, 0.35, 0.10];
        for total in [0, 1, 7, 25, 50, 333, 5_000] {
            let counts = apportion(total, &shares);
            assert_eq!(counts.iter().sum::<usize>(), total, "total {total}");
        }
        assert_eq!(apportion(25, &shares), vec![10, 4, 9, 2]);
        assert_eq!(apportion(5, &[1.0, 1.0]), vec![3, 2]);
    }

    #[test]
    fn managerial_titles_are_detected() {
        assert!(is_managerial_title("Engineering Manager"));
        assert!(is_managerial_title("VP Marketing"));
        assert!(!is_managerial_title("Staff Engineer"));
    }

    #[test]
    fn duplicate_emails_get_suffixes() {
        let mut taken = HashSet::new();
        assert_eq!(unique_email("Ada", "Li", "x.com", &mut taken), "ada.li@x.com");
        assert_eq!(unique_email("Ada", "Li", "x.com", &mut taken), "ada.li1@x.com");
        assert_eq!(unique_email("Ada", "Li", "x.com", &mut taken), "ada.li2@x.com");
    }
}
