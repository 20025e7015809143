use std::collections::BTreeSet;

use chrono::Duration;

use seedwork_core::Organization;

use super::StageContext;
use crate::errors::GenerationError;
use crate::temporal::{Bias, pick_timestamp};

const NAME_ATTEMPTS: usize = 25;

pub fn generate(ctx: &mut StageContext<'_>) -> Result<Vec<Organization>, GenerationError> {
    let count = ctx.config.organizations as usize;
    let founded_latest = ctx.anchors.company_created - Duration::days(2 * 365);
    let founded_earliest = ctx.anchors.company_created - Duration::days(8 * 365);

    let mut used = BTreeSet::new();
    let mut organizations = Vec::with_capacity(count);

    for index in 0..count {
        let name = unique_company_name(ctx, &used, index)?;
        used.insert(name.clone());

        let created_at = pick_timestamp(
            founded_earliest,
            founded_latest,
            &Bias::Uniform,
            &mut ctx.rng,
        )?;
        organizations.push(Organization {
            id: ctx.next_id(),
            domain: domain_for(&name),
            name,
            created_at,
        });
    }

    Ok(organizations)
}

fn unique_company_name(
    ctx: &mut StageContext<'_>,
    used: &BTreeSet<String>,
    index: usize,
) -> Result<String, GenerationError> {
    for _ in 0..NAME_ATTEMPTS {
        let candidate = ctx.content.weighted_choice("company", &mut ctx.rng)?;
        if !used.contains(&candidate) {
            return Ok(candidate);
        }
    }

    let mut suffix = index + 1;
    loop {
        let candidate = format!("TechCorp{suffix}");
        if !used.contains(&candidate) {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

/// `"Edge Delta"` becomes `"edgedelta.com"`.
pub fn domain_for(name: &str) -> String {
    let stem: String = name
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '.' | '-'))
        .flat_map(char::to_lowercase)
        .collect();
    format!("{stem}.com")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_strips_separators() {
        assert_eq!(domain_for("Edge Delta"), "edgedelta.com");
        assert_eq!(domain_for("Trigger.dev"), "triggerdev.com");
        assert_eq!(domain_for("People.ai"), "peopleai.com");
    }
}
