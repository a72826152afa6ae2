use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::{filters::ineligibility, scoring::calculate_match_score};
use crate::models::{Dimension, ExclusionSet, Profile, ProfileId, ScoredCandidate, ScoringWeights};

/// Call-level precondition failures. Nothing about an individual candidate
/// record can produce one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankError {
    #[error("weight for {dimension} must be a finite non-negative number, got {weight}")]
    InvalidWeight { dimension: Dimension, weight: f64 },

    #[error("result cap must be positive")]
    InvalidCap,

    #[error("seed profile {seed} has no city")]
    MissingSeedCity { seed: ProfileId },
}

/// Result of the ranking process
#[derive(Debug)]
pub struct MatchResult {
    pub matches: Vec<ScoredCandidate>,
    /// Raw pool size, duplicates included
    pub total_candidates: usize,
    pub unique_candidates: usize,
    pub eligible_candidates: usize,
}

/// Ranking orchestrator
///
/// # Pipeline Stages
/// 1. Call-level validation (weights, cap, seed city)
/// 2. Deduplication by identity, last-seen record wins
/// 3. Eligibility filtering (self, closed, exclusions, city)
/// 4. Weighted scoring
/// 5. Sort by score descending, identity ascending; truncate to cap
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Rank a raw candidate pool for the seed user.
    ///
    /// # Arguments
    /// * `seed` - The user the search runs for
    /// * `raw_candidates` - Concatenated fetch batches, possibly overlapping
    /// * `exclusions` - Blacklist, favorites and view history of the seed
    /// * `cap` - Maximum number of matches to return
    ///
    /// # Returns
    /// MatchResult with at most `cap` candidates in a reproducible order
    pub fn rank(
        &self,
        seed: &Profile,
        raw_candidates: Vec<Profile>,
        exclusions: &ExclusionSet,
        cap: usize,
    ) -> Result<MatchResult, RankError> {
        validate(seed, &self.weights, cap)?;

        let total_candidates = raw_candidates.len();
        let unique = deduplicate(raw_candidates);
        let unique_candidates = unique.len();

        let mut scored: Vec<ScoredCandidate> = unique
            .into_iter()
            .filter(|profile| match ineligibility(profile, seed, exclusions) {
                Some(reason) => {
                    tracing::trace!("Dropping candidate {}: {}", profile.id, reason);
                    false
                }
                None => true,
            })
            .map(|profile| {
                let (score, breakdown) = calculate_match_score(seed, &profile, &self.weights);
                ScoredCandidate {
                    score,
                    profile,
                    breakdown,
                }
            })
            .collect();

        let eligible_candidates = scored.len();

        // Sort by score (descending) and then by identity (ascending)
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.profile.id.cmp(&b.profile.id))
        });

        scored.truncate(cap);

        tracing::debug!(
            "Ranked candidates for {}: pool={}, unique={}, eligible={}, returned={}",
            seed.id,
            total_candidates,
            unique_candidates,
            eligible_candidates,
            scored.len()
        );

        Ok(MatchResult {
            matches: scored,
            total_candidates,
            unique_candidates,
            eligible_candidates,
        })
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

/// Rank candidates with explicit weights; see [`Matcher::rank`].
pub fn rank(
    seed: &Profile,
    raw_candidates: Vec<Profile>,
    exclusions: &ExclusionSet,
    weights: &ScoringWeights,
    cap: usize,
) -> Result<Vec<ScoredCandidate>, RankError> {
    Matcher::new(*weights)
        .rank(seed, raw_candidates, exclusions, cap)
        .map(|result| result.matches)
}

/// Reject arguments that would produce a misleading ranking
pub fn validate(seed: &Profile, weights: &ScoringWeights, cap: usize) -> Result<(), RankError> {
    validate_weights(weights)?;

    if cap == 0 {
        return Err(RankError::InvalidCap);
    }

    if seed.city_id.is_none() {
        return Err(RankError::MissingSeedCity { seed: seed.id });
    }

    Ok(())
}

/// Every weight must be finite and non-negative
pub fn validate_weights(weights: &ScoringWeights) -> Result<(), RankError> {
    for (dimension, weight) in weights.iter() {
        if !weight.is_finite() || weight < 0.0 {
            return Err(RankError::InvalidWeight { dimension, weight });
        }
    }

    Ok(())
}

/// Collapse repeated identities. Batches arrive in ascending preference
/// order, so the last record seen for an identity replaces earlier ones.
pub fn deduplicate(raw_candidates: Vec<Profile>) -> Vec<Profile> {
    let mut by_id: BTreeMap<ProfileId, Profile> = BTreeMap::new();
    for profile in raw_candidates {
        by_id.insert(profile.id, profile);
    }
    by_id.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BirthDate;

    fn create_candidate(id: i64, birth_year: Option<i32>, city_id: i64) -> Profile {
        Profile {
            id,
            handle: format!("id{}", id),
            city_id: Some(city_id),
            birth_date: birth_year.map(|year| BirthDate {
                day: None,
                month: None,
                year: Some(year),
            }),
            ..Default::default()
        }
    }

    fn create_seed() -> Profile {
        create_candidate(1, Some(1994), 2)
    }

    #[test]
    fn test_rank_basic() {
        let matcher = Matcher::with_default_weights();
        let seed = create_seed();

        let candidates = vec![
            create_candidate(10, Some(1994), 2), // Same age, same city
            create_candidate(11, Some(1994), 3), // Other city
            create_candidate(1, Some(1994), 2),  // Self
        ];

        let result = matcher
            .rank(&seed, candidates, &ExclusionSet::default(), 10)
            .unwrap();

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].profile.id, 10);
        assert_eq!(result.total_candidates, 3);
        assert_eq!(result.eligible_candidates, 1);
    }

    #[test]
    fn test_matches_sorted_by_score_then_id() {
        let weights = ScoringWeights::zero().with(Dimension::Age, 1.0);
        let matcher = Matcher::new(weights);
        let seed = create_seed();

        let candidates = vec![
            create_candidate(30, Some(1999), 2),
            create_candidate(20, Some(1994), 2),
            create_candidate(25, Some(1999), 2),
        ];

        let result = matcher
            .rank(&seed, candidates, &ExclusionSet::default(), 10)
            .unwrap();

        let ids: Vec<i64> = result.matches.iter().map(|m| m.profile.id).collect();
        assert_eq!(ids, vec![20, 25, 30]);
    }

    #[test]
    fn test_respects_cap() {
        let matcher = Matcher::with_default_weights();
        let seed = create_seed();

        let candidates: Vec<Profile> = (0..20)
            .map(|i| create_candidate(100 + i, Some(1990 + (i % 10) as i32), 2))
            .collect();

        let result = matcher
            .rank(&seed, candidates, &ExclusionSet::default(), 5)
            .unwrap();

        assert_eq!(result.matches.len(), 5);
    }

    #[test]
    fn test_last_seen_duplicate_wins() {
        let mut first = create_candidate(77, Some(1994), 2);
        first.interests = Some("chess".to_string());
        let mut second = create_candidate(77, Some(1994), 2);
        second.interests = Some("hiking".to_string());

        let unique = deduplicate(vec![first, create_candidate(5, None, 2), second]);

        assert_eq!(unique.len(), 2);
        let survivor = unique.iter().find(|p| p.id == 77).unwrap();
        assert_eq!(survivor.interests.as_deref(), Some("hiking"));
    }

    #[test]
    fn test_rejects_invalid_arguments() {
        let seed = create_seed();
        let exclusions = ExclusionSet::default();

        let negative = ScoringWeights::default().with(Dimension::Music, -0.1);
        assert_eq!(
            rank(&seed, vec![], &exclusions, &negative, 10),
            Err(RankError::InvalidWeight {
                dimension: Dimension::Music,
                weight: -0.1
            })
        );

        let nan = ScoringWeights::default().with(Dimension::Books, f64::NAN);
        assert!(matches!(
            rank(&seed, vec![], &exclusions, &nan, 10),
            Err(RankError::InvalidWeight { dimension: Dimension::Books, .. })
        ));

        assert_eq!(
            rank(&seed, vec![], &exclusions, &ScoringWeights::default(), 0),
            Err(RankError::InvalidCap)
        );

        let mut cityless = create_seed();
        cityless.city_id = None;
        assert_eq!(
            rank(&cityless, vec![], &exclusions, &ScoringWeights::default(), 10),
            Err(RankError::MissingSeedCity { seed: 1 })
        );
    }

    #[test]
    fn test_validate_weights_alone() {
        assert_eq!(validate_weights(&ScoringWeights::default()), Ok(()));
        assert_eq!(validate_weights(&ScoringWeights::zero()), Ok(()));
        assert_eq!(
            validate_weights(&ScoringWeights::zero().with(Dimension::Age, -1.0)),
            Err(RankError::InvalidWeight {
                dimension: Dimension::Age,
                weight: -1.0
            })
        );
        let infinite = ScoringWeights::zero().with(Dimension::Groups, f64::INFINITY);
        assert!(validate_weights(&infinite).is_err());
    }

    #[test]
    fn test_empty_pool_is_not_an_error() {
        let result = rank(
            &create_seed(),
            vec![],
            &ExclusionSet::default(),
            &ScoringWeights::default(),
            10,
        )
        .unwrap();
        assert!(result.is_empty());
    }
}
