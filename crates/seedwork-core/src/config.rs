use std::collections::BTreeMap;

use chrono::{NaiveDateTime, SubsecRound, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::ProjectType;
use crate::error::{Error, Result};

/// Creation-day weights, Monday through Sunday.
pub const DEFAULT_DAY_WEIGHTS: [f64; 7] = [0.85, 0.95, 0.90, 0.75, 0.65, 0.20, 0.15];

/// Longest history window a config may ask for (one hundred years).
pub const MAX_HISTORY_MONTHS: u32 = 1200;

/// Inclusive probability range; each project draws its own rate from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RateRange {
    pub min: f64,
    pub max: f64,
}

impl RateRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Tunables for a generation run.
///
/// Every option shapes sampling distributions only; the temporal and
/// relational invariants hold for any valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Number of organizations.
    pub organizations: u32,
    /// Total users, split evenly across organizations.
    pub users: u32,
    /// Months of project history before the reference time, at most 1200.
    pub history_months: u32,
    /// Average tasks per user; the batch holds `users * tasks_per_user` tasks.
    pub tasks_per_user: u32,
    /// Seed for every stage generator. A random seed is drawn when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Timestamp treated as "now". Defaults to the wall clock at run start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<NaiveDateTime>,
    /// Probability that a task has no assignee.
    pub unassigned_rate: f64,
    /// Completion-rate range per project type.
    pub completion_rates: BTreeMap<ProjectType, RateRange>,
    /// Creation-day weights, Monday first.
    pub day_weights: [f64; 7],
    /// Share of sprint projects that run exactly two weeks.
    pub two_week_sprint_rate: f64,
    /// Probability that a user joins a second team.
    pub secondary_team_rate: f64,
    /// Share of tasks created by a manager.
    pub manager_creator_rate: f64,
    /// Share of assigned tasks that go to non-managers.
    pub non_manager_assignee_rate: f64,
    /// Probability that a task is blocked by an earlier task of its project.
    pub dependency_rate: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            organizations: 3,
            users: 5000,
            history_months: 6,
            tasks_per_user: 10,
            seed: None,
            reference_time: None,
            unassigned_rate: 0.15,
            completion_rates: default_completion_rates(),
            day_weights: DEFAULT_DAY_WEIGHTS,
            two_week_sprint_rate: 0.591,
            secondary_team_rate: 0.15,
            manager_creator_rate: 0.70,
            non_manager_assignee_rate: 0.85,
            dependency_rate: 0.08,
        }
    }
}

impl GenerationConfig {
    /// Small preset for smoke runs.
    pub fn minimal() -> Self {
        Self {
            organizations: 2,
            users: 100,
            history_months: 2,
            tasks_per_user: 5,
            ..Self::default()
        }
    }

    pub fn total_tasks(&self) -> u64 {
        u64::from(self.users) * u64::from(self.tasks_per_user)
    }

    /// Completion range for a project type, falling back to 0.50..0.70.
    pub fn completion_range(&self, project_type: ProjectType) -> RateRange {
        self.completion_rates
            .get(&project_type)
            .copied()
            .unwrap_or(RateRange::new(0.50, 0.70))
    }

    /// The configured reference time, or the wall clock truncated to seconds.
    pub fn resolve_reference_time(&self) -> NaiveDateTime {
        self.reference_time
            .unwrap_or_else(|| Utc::now().naive_utc())
            .trunc_subsecs(0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.organizations == 0 {
            return Err(Error::InvalidConfig(
                "organizations must be at least 1".to_string(),
            ));
        }
        if self.users < self.organizations {
            return Err(Error::InvalidConfig(format!(
                "users ({}) must be at least the number of organizations ({})",
                self.users, self.organizations
            )));
        }
        if self.history_months == 0 {
            return Err(Error::InvalidConfig(
                "history_months must be at least 1".to_string(),
            ));
        }
        if self.history_months > MAX_HISTORY_MONTHS {
            return Err(Error::InvalidConfig(format!(
                "history_months must be at most {MAX_HISTORY_MONTHS}, got {}",
                self.history_months
            )));
        }

        let rates = [
            ("unassigned_rate", self.unassigned_rate),
            ("two_week_sprint_rate", self.two_week_sprint_rate),
            ("secondary_team_rate", self.secondary_team_rate),
            ("manager_creator_rate", self.manager_creator_rate),
            ("non_manager_assignee_rate", self.non_manager_assignee_rate),
            ("dependency_rate", self.dependency_rate),
        ];
        for (name, value) in rates {
            check_probability(name, value)?;
        }

        for (project_type, range) in &self.completion_rates {
            let name = format!("completion_rates.{}", project_type.as_str());
            check_probability(&format!("{name}.min"), range.min)?;
            check_probability(&format!("{name}.max"), range.max)?;
            if range.min > range.max {
                return Err(Error::InvalidConfig(format!(
                    "{name}: min {} exceeds max {}",
                    range.min, range.max
                )));
            }
        }

        for (day, weight) in self.day_weights.iter().enumerate() {
            check_probability(&format!("day_weights[{day}]"), *weight)?;
        }

        Ok(())
    }
}

pub fn default_completion_rates() -> BTreeMap<ProjectType, RateRange> {
    BTreeMap::from([
        (ProjectType::Sprint, RateRange::new(0.70, 0.85)),
        (ProjectType::Campaign, RateRange::new(0.60, 0.75)),
        (ProjectType::Process, RateRange::new(0.40, 0.50)),
        (ProjectType::CrossFunctional, RateRange::new(0.55, 0.70)),
        (ProjectType::Oversight, RateRange::new(0.50, 0.65)),
    ])
}

fn check_probability(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        GenerationConfig::default().validate().unwrap();
        GenerationConfig::minimal().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_rate() {
        let config = GenerationConfig {
            unassigned_rate: 1.5,
            ..GenerationConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unassigned_rate"));
    }

    #[test]
    fn rejects_inverted_completion_range() {
        let mut config = GenerationConfig::default();
        config
            .completion_rates
            .insert(ProjectType::Sprint, RateRange::new(0.9, 0.1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_workspace() {
        let config = GenerationConfig {
            organizations: 0,
            ..GenerationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_history_beyond_the_calendar() {
        let config = GenerationConfig {
            history_months: 10_000_000,
            ..GenerationConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("history_months"));

        let longest = GenerationConfig {
            history_months: MAX_HISTORY_MONTHS,
            ..GenerationConfig::default()
        };
        longest.validate().unwrap();
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: GenerationConfig =
            serde_json::from_str(r#"{"users": 50, "seed": 42}"#).unwrap();
        assert_eq!(config.users, 50);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.organizations, 3);
        assert_eq!(config.day_weights, DEFAULT_DAY_WEIGHTS);
        assert_eq!(
            config.completion_range(ProjectType::Process),
            RateRange::new(0.40, 0.50)
        );
    }

    #[test]
    fn reference_time_drops_subseconds() {
        let config = GenerationConfig::default();
        let now = config.resolve_reference_time();
        assert_eq!(now.and_utc().timestamp_subsec_nanos(), 0);
    }
}
