use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::errors::GenerationError;

/// Candidate identifiers plus named sub-pools and an optional fallback.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool<'a> {
    groups: BTreeMap<&'static str, Vec<&'a str>>,
    fallback: Vec<&'a str>,
}

impl<'a> CandidatePool<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, name: &'static str, members: Vec<&'a str>) -> Self {
        self.groups.insert(name, members);
        self
    }

    /// Pool used whenever the requested group is empty.
    pub fn with_fallback(mut self, members: Vec<&'a str>) -> Self {
        self.fallback = members;
        self
    }

    pub fn group(&self, name: &str) -> &[&'a str] {
        self.groups.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Uniform pick from the fallback pool.
    pub fn any<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&'a str, GenerationError> {
        self.fallback
            .choose(rng)
            .copied()
            .ok_or_else(|| GenerationError::EmptyPool {
                pool: FALLBACK.to_string(),
            })
    }

    fn candidates(&self, name: &'static str) -> Result<&[&'a str], GenerationError> {
        let group = self.group(name);
        if !group.is_empty() {
            return Ok(group);
        }
        if !self.fallback.is_empty() {
            return Ok(&self.fallback);
        }
        Err(GenerationError::EmptyPool {
            pool: name.to_string(),
        })
    }
}

/// Preference for one selection: draw from `preferred` with probability
/// `preferred_rate`, otherwise from `alternate` (or the fallback pool when no
/// alternate is named). `unassigned_rate` is rolled first and independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRule {
    pub preferred: &'static str,
    pub preferred_rate: f64,
    pub alternate: Option<&'static str>,
    pub unassigned_rate: f64,
}

impl SelectionRule {
    pub fn prefer(preferred: &'static str, preferred_rate: f64) -> Self {
        Self {
            preferred,
            preferred_rate,
            alternate: None,
            unassigned_rate: 0.0,
        }
    }

    pub fn otherwise(mut self, alternate: &'static str) -> Self {
        self.alternate = Some(alternate);
        self
    }

    pub fn unassigned(mut self, rate: f64) -> Self {
        self.unassigned_rate = rate;
        self
    }
}

/// Group name used when a rule has no alternate.
const FALLBACK: &str = "fallback";

/// Pick one candidate, or `None` when the unassigned roll hits.
pub fn select<'a, R: Rng + ?Sized>(
    pool: &CandidatePool<'a>,
    rule: &SelectionRule,
    rng: &mut R,
) -> Result<Option<&'a str>, GenerationError> {
    if rule.unassigned_rate > 0.0 && rng.random_bool(rule.unassigned_rate) {
        return Ok(None);
    }

    let group = if rng.random_bool(rule.preferred_rate) {
        rule.preferred
    } else {
        rule.alternate.unwrap_or(FALLBACK)
    };

    let candidates = pool.candidates(group)?;
    Ok(candidates.choose(rng).copied())
}

/// Pick one required candidate; the unassigned roll is ignored.
pub fn select_required<'a, R: Rng + ?Sized>(
    pool: &CandidatePool<'a>,
    rule: &SelectionRule,
    rng: &mut R,
) -> Result<&'a str, GenerationError> {
    let rule = SelectionRule {
        unassigned_rate: 0.0,
        ..*rule
    };
    select(pool, &rule, rng)?.ok_or_else(|| GenerationError::EmptyPool {
        pool: rule.preferred.to_string(),
    })
}

/// Exactly one primary pick plus an independent, lower-probability secondary
/// pick from the remaining candidates.
pub fn primary_and_secondary<'t, T, R: Rng + ?Sized>(
    candidates: &'t [T],
    secondary_rate: f64,
    rng: &mut R,
) -> Result<(&'t T, Option<&'t T>), GenerationError> {
    if candidates.is_empty() {
        return Err(GenerationError::EmptyPool {
            pool: "primary".to_string(),
        });
    }

    let primary_index = rng.random_range(0..candidates.len());
    let primary = &candidates[primary_index];

    if candidates.len() < 2 || !rng.random_bool(secondary_rate) {
        return Ok((primary, None));
    }

    let mut secondary_index = rng.random_range(0..candidates.len() - 1);
    if secondary_index >= primary_index {
        secondary_index += 1;
    }
    Ok((primary, Some(&candidates[secondary_index])))
}

/// Draw one value from `(value, weight)` pairs.
pub fn pick_weighted<'t, T, R: Rng + ?Sized>(
    options: &'t [(T, f64)],
    rng: &mut R,
) -> Result<&'t T, GenerationError> {
    options
        .choose_weighted(rng, |(_, weight)| *weight)
        .map(|(value, _)| value)
        .map_err(|err| GenerationError::Content(format!("weighted options: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pool<'a>() -> CandidatePool<'a> {
        CandidatePool::new()
            .with_group("managers", vec!["m1", "m2"])
            .with_group("non_managers", vec!["u1", "u2", "u3"])
            .with_fallback(vec!["m1", "m2", "u1", "u2", "u3"])
    }

    #[test]
    fn unassigned_rate_converges() {
        let pool = pool();
        let rule = SelectionRule::prefer("non_managers", 0.85)
            .otherwise("managers")
            .unassigned(0.15);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let total = 20_000;
        let unassigned = (0..total)
            .filter(|_| select(&pool, &rule, &mut rng).unwrap().is_none())
            .count();
        let rate = unassigned as f64 / total as f64;
        assert!((rate - 0.15).abs() < 0.02, "rate = {rate}");
    }

    #[test]
    fn preference_ratio_is_honored() {
        let pool = pool();
        let rule = SelectionRule::prefer("managers", 0.70);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let total = 10_000;
        let managers = (0..total)
            .filter(|_| {
                let pick = select_required(&pool, &rule, &mut rng).unwrap();
                pick.starts_with('m')
            })
            .count();
        // 0.70 direct plus 0.30 * 2/5 through the fallback pool.
        let rate = managers as f64 / total as f64;
        assert!((rate - 0.82).abs() < 0.02, "rate = {rate}");
    }

    #[test]
    fn empty_group_uses_fallback() {
        let pool = CandidatePool::new()
            .with_group("managers", Vec::new())
            .with_fallback(vec!["u1"]);
        let rule = SelectionRule::prefer("managers", 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(select_required(&pool, &rule, &mut rng).unwrap(), "u1");
    }

    #[test]
    fn empty_group_without_fallback_fails() {
        let pool = CandidatePool::new().with_group("managers", Vec::new());
        let rule = SelectionRule::prefer("managers", 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = select(&pool, &rule, &mut rng).unwrap_err();
        assert!(matches!(err, GenerationError::EmptyPool { pool } if pool == "managers"));
    }

    #[test]
    fn secondary_pick_differs_from_primary() {
        let teams = ["a", "b", "c"];
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut secondaries = 0;
        for _ in 0..5_000 {
            let (primary, secondary) = primary_and_secondary(&teams, 0.15, &mut rng).unwrap();
            if let Some(secondary) = secondary {
                assert_ne!(primary, secondary);
                secondaries += 1;
            }
        }
        let rate = secondaries as f64 / 5_000.0;
        assert!((rate - 0.15).abs() < 0.03, "rate = {rate}");
    }

    #[test]
    fn weighted_pick_follows_weights() {
        let options = [("member", 0.80), ("lead", 0.15), ("admin", 0.05)];
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let members = (0..10_000)
            .filter(|_| *pick_weighted(&options, &mut rng).unwrap() == "member")
            .count();
        assert!((members as f64 / 10_000.0 - 0.80).abs() < 0.02);
        assert!(pick_weighted::<&str, _>(&[], &mut rng).is_err());
    }

    #[test]
    fn single_candidate_never_gets_secondary() {
        let teams = ["only"];
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..100 {
            let (primary, secondary) = primary_and_secondary(&teams, 1.0, &mut rng).unwrap();
            assert_eq!(*primary, "only");
            assert!(secondary.is_none());
        }
    }
}
