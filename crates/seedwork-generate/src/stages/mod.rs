//! One generator per entity stage.
//!
//! Each stage reads the finished output of its upstream stages as slices and
//! returns its own collection; nothing is mutated after it is returned.

pub mod dependencies;
pub mod departments;
pub mod memberships;
pub mod organizations;
pub mod projects;
pub mod tasks;
pub mod teams;
pub mod users;

use chrono::{Duration, NaiveDateTime};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use seedwork_core::{GenerationConfig, Stage};

use crate::content::ContentProvider;
use crate::errors::GenerationError;
use crate::model::GenerationReport;

/// Reference points every stage derives its windows from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAnchors {
    /// The run's "now"; nothing is dated after it.
    pub now: NaiveDateTime,
    /// Upper bound for organization founding dates.
    pub company_created: NaiveDateTime,
    /// Earliest project creation time.
    pub history_start: NaiveDateTime,
}

impl TimeAnchors {
    /// Fails when a window reaches past the earliest representable time.
    pub fn new(now: NaiveDateTime, history_months: u32) -> Result<Self, GenerationError> {
        let back = |label: &str, days: i64| {
            Duration::try_days(days)
                .and_then(|window| now.checked_sub_signed(window))
                .ok_or_else(|| {
                    GenerationError::InvalidConfig(seedwork_core::Error::InvalidConfig(format!(
                        "{label} window of {days} days before {now} is out of range"
                    )))
                })
        };
        Ok(Self {
            now,
            company_created: back("company history", 5 * 365)?,
            history_start: back("history_months", i64::from(history_months) * 30)?,
        })
    }
}

/// Everything a stage needs besides its upstream collections.
pub struct StageContext<'a> {
    pub config: &'a GenerationConfig,
    pub content: &'a dyn ContentProvider,
    pub anchors: TimeAnchors,
    pub rng: ChaCha8Rng,
    pub report: &'a mut GenerationReport,
}

impl<'a> StageContext<'a> {
    pub fn new(
        stage: Stage,
        seed: u64,
        config: &'a GenerationConfig,
        content: &'a dyn ContentProvider,
        anchors: TimeAnchors,
        report: &'a mut GenerationReport,
    ) -> Self {
        Self {
            config,
            content,
            anchors,
            rng: ChaCha8Rng::seed_from_u64(hash_seed(seed, stage.name())),
            report,
        }
    }

    /// UUIDv4 drawn from the stage generator.
    pub fn next_id(&mut self) -> String {
        uuid::Builder::from_random_bytes(self.rng.random())
            .into_uuid()
            .to_string()
    }
}

/// Accept a sampled record if it passes `check`; otherwise rebuild it once
/// from a clamped window and fail the run if that still does not hold.
///
/// An inverted sampling window (`GenerationError::Range`) counts as a failed
/// first attempt.
pub fn resolve<T>(
    report: &mut GenerationReport,
    entity: &'static str,
    id: &str,
    sampled: Result<T, GenerationError>,
    clamped: impl FnOnce() -> T,
    check: impl Fn(&T) -> Result<(), String>,
) -> Result<T, GenerationError> {
    let first_failure = match sampled {
        Ok(record) => match check(&record) {
            Ok(()) => return Ok(record),
            Err(message) => message,
        },
        Err(GenerationError::Range { lower, upper }) => {
            format!("empty window {lower} .. {upper}")
        }
        Err(err) => return Err(err),
    };

    debug!(entity, id, reason = %first_failure, "retrying with clamped window");
    report.record_retry(entity);

    let record = clamped();
    check(&record).map_err(|message| GenerationError::ConstraintViolation {
        entity,
        id: id.to_string(),
        message,
    })?;
    Ok(record)
}

/// Derive an independent stage seed from the run seed.
pub fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_seeds_differ() {
        let a = hash_seed(42, Stage::Users.name());
        let b = hash_seed(42, Stage::Teams.name());
        assert_ne!(a, b);
        assert_eq!(a, hash_seed(42, "users"));
    }

    #[test]
    fn inverted_window_is_clamped_and_counted() {
        let now = NaiveDateTime::parse_from_str("2024-06-30 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let mut report = GenerationReport::new("test".to_string(), 1, now);
        let sampled = Err(GenerationError::Range {
            lower: now,
            upper: now - Duration::hours(1),
        });

        let value = resolve(&mut report, "team", "t1", sampled, || now, |_| Ok(())).unwrap();
        assert_eq!(value, now);
        assert_eq!(report.retries_total, 1);
        assert_eq!(report.retries_by_entity.get("team"), Some(&1));
    }

    #[test]
    fn failing_clamp_is_a_constraint_violation() {
        let now = NaiveDateTime::parse_from_str("2024-06-30 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let mut report = GenerationReport::new("test".to_string(), 1, now);

        let err = resolve(
            &mut report,
            "project",
            "p1",
            Ok(now),
            || now,
            |value| {
                if *value == now {
                    Err("always wrong".to_string())
                } else {
                    Ok(())
                }
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::ConstraintViolation { entity: "project", .. }
        ));
    }

    #[test]
    fn anchors_follow_history_window() {
        let now = NaiveDateTime::parse_from_str("2024-06-30 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let anchors = TimeAnchors::new(now, 2).unwrap();
        assert_eq!(anchors.now - anchors.history_start, Duration::days(60));
        assert!(anchors.company_created < anchors.history_start);
    }

    #[test]
    fn anchors_before_the_calendar_start_are_rejected() {
        let near_start = NaiveDateTime::MIN + Duration::days(10);
        let err = TimeAnchors::new(near_start, 1).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidConfig(_)));

        let now = NaiveDateTime::parse_from_str("2024-06-30 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        assert!(TimeAnchors::new(now, u32::MAX).is_err());
    }
}
