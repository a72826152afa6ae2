use crate::core::similarity::{jaccard, similarity};
use crate::models::{Dimension, DimensionScore, Profile, ScoringWeights};

/// Birth-year difference at which the age partial score reaches zero
const AGE_SPAN_YEARS: f64 = 10.0;

/// Calculate the weighted match score of a candidate against the seed.
///
/// score = Σ weight[dim] * partial[dim]
///
/// Dimensions with a weight of zero are not evaluated at all and do not
/// appear in the returned breakdown.
pub fn calculate_match_score(
    seed: &Profile,
    candidate: &Profile,
    weights: &ScoringWeights,
) -> (f64, Vec<DimensionScore>) {
    let mut total = 0.0;
    let mut breakdown = Vec::with_capacity(Dimension::ALL.len());

    for (dimension, weight) in weights.iter() {
        if weight <= 0.0 {
            continue;
        }

        let partial = partial_score(dimension, seed, candidate);
        let weighted = weight * partial;
        total += weighted;

        breakdown.push(DimensionScore {
            dimension,
            partial,
            weighted,
        });
    }

    (total, breakdown)
}

/// Unweighted score in [0, 1] for a single dimension
pub fn partial_score(dimension: Dimension, seed: &Profile, candidate: &Profile) -> f64 {
    match dimension {
        Dimension::Age => age_score(seed, candidate),
        Dimension::City => city_score(seed, candidate),
        Dimension::Interests => text_score(&seed.interests, &candidate.interests),
        Dimension::Music => text_score(&seed.music, &candidate.music),
        Dimension::Books => text_score(&seed.books, &candidate.books),
        Dimension::Groups => jaccard(&seed.groups, &candidate.groups),
    }
}

/// Age score (0-1)
/// Only birth years are compared, so both ages are measured on the same day
/// and the reference date cancels out.
#[inline]
fn age_score(seed: &Profile, candidate: &Profile) -> f64 {
    match (seed.birth_year(), candidate.birth_year()) {
        (Some(a), Some(b)) => {
            let diff = (a - b).abs() as f64;
            (1.0 - diff / AGE_SPAN_YEARS).max(0.0)
        }
        _ => 0.0,
    }
}

#[inline]
fn city_score(seed: &Profile, candidate: &Profile) -> f64 {
    match (seed.city_id, candidate.city_id) {
        (Some(a), Some(b)) if a == b => 1.0,
        _ => 0.0,
    }
}

#[inline]
fn text_score(seed: &Option<String>, candidate: &Option<String>) -> f64 {
    match (seed.as_deref(), candidate.as_deref()) {
        (Some(a), Some(b)) => similarity(a, b),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BirthDate;

    fn profile_born(id: i64, year: Option<i32>) -> Profile {
        Profile {
            id,
            city_id: Some(1),
            birth_date: year.map(|y| BirthDate {
                day: Some(1),
                month: Some(1),
                year: Some(y),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_age_score() {
        let seed = profile_born(1, Some(1994));
        assert_eq!(age_score(&seed, &profile_born(2, Some(1994))), 1.0);
        assert!((age_score(&seed, &profile_born(2, Some(1999))) - 0.5).abs() < 1e-9);
        assert_eq!(age_score(&seed, &profile_born(2, Some(1984))), 0.0);
        assert_eq!(age_score(&seed, &profile_born(2, Some(1970))), 0.0);
    }

    #[test]
    fn test_unknown_age_scores_zero() {
        let seed = profile_born(1, Some(1994));
        assert_eq!(age_score(&seed, &profile_born(2, None)), 0.0);
        assert_eq!(age_score(&profile_born(2, None), &seed), 0.0);
    }

    #[test]
    fn test_city_score() {
        let seed = profile_born(1, None);
        let mut other = profile_born(2, None);
        assert_eq!(city_score(&seed, &other), 1.0);
        other.city_id = Some(2);
        assert_eq!(city_score(&seed, &other), 0.0);
        other.city_id = None;
        assert_eq!(city_score(&seed, &other), 0.0);
    }

    #[test]
    fn test_zero_weight_dimensions_skipped() {
        let seed = profile_born(1, Some(1990));
        let candidate = profile_born(2, Some(1990));
        let weights = ScoringWeights::zero().with(Dimension::Age, 0.3);

        let (score, breakdown) = calculate_match_score(&seed, &candidate, &weights);

        assert!((score - 0.3).abs() < 1e-12);
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].dimension, Dimension::Age);
    }

    #[test]
    fn test_weighted_sum() {
        let mut seed = profile_born(1, Some(1990));
        seed.interests = Some("hiking, chess".to_string());
        seed.groups = [10, 20].into_iter().collect();
        let mut candidate = profile_born(2, Some(1995));
        candidate.interests = Some("chess hiking".to_string());
        candidate.groups = [20, 30, 40].into_iter().collect();

        let weights = ScoringWeights::default();
        let (score, breakdown) = calculate_match_score(&seed, &candidate, &weights);

        // age 0.5*0.3 + city 1.0*0.2 + interests 1.0*0.2 + groups 0.25*0.1
        let expected = 0.15 + 0.2 + 0.2 + 0.025;
        assert!((score - expected).abs() < 1e-9, "got {}", score);
        assert_eq!(breakdown.len(), 6);
    }
}
