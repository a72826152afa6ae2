use crate::models::{ExclusionSet, Profile};
use std::fmt;

/// Why a candidate was dropped before scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ineligibility {
    SelfMatch,
    Closed,
    Blacklisted,
    Favorited,
    PreviouslyViewed,
    OtherCity,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Ineligibility::SelfMatch => "self",
            Ineligibility::Closed => "closed profile",
            Ineligibility::Blacklisted => "blacklisted",
            Ineligibility::Favorited => "already favorited",
            Ineligibility::PreviouslyViewed => "already viewed",
            Ineligibility::OtherCity => "different or unknown city",
        };
        f.write_str(reason)
    }
}

/// Check whether a candidate may be shown to the seed user.
///
/// Returns the first rule the candidate breaks, in a fixed order.
#[inline]
pub fn ineligibility(
    candidate: &Profile,
    seed: &Profile,
    exclusions: &ExclusionSet,
) -> Option<Ineligibility> {
    if candidate.id == seed.id {
        return Some(Ineligibility::SelfMatch);
    }

    if candidate.is_closed {
        return Some(Ineligibility::Closed);
    }

    if exclusions.blacklisted.contains(&candidate.id) {
        return Some(Ineligibility::Blacklisted);
    }

    if exclusions.favorited.contains(&candidate.id) {
        return Some(Ineligibility::Favorited);
    }

    if exclusions.previously_viewed.contains(&candidate.id) {
        return Some(Ineligibility::PreviouslyViewed);
    }

    // Searches are per city but cross-city results still come back
    match (candidate.city_id, seed.city_id) {
        (Some(c), Some(s)) if c == s => None,
        _ => Some(Ineligibility::OtherCity),
    }
}

#[inline]
pub fn is_eligible(candidate: &Profile, seed: &Profile, exclusions: &ExclusionSet) -> bool {
    ineligibility(candidate, seed, exclusions).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_profile(id: i64, city_id: Option<i64>) -> Profile {
        Profile {
            id,
            city_id,
            ..Default::default()
        }
    }

    #[test]
    fn test_eligible_candidate() {
        let seed = create_profile(1, Some(99));
        let candidate = create_profile(2, Some(99));
        assert!(is_eligible(&candidate, &seed, &ExclusionSet::default()));
    }

    #[test]
    fn test_self_is_never_eligible() {
        let seed = create_profile(1, Some(99));
        assert_eq!(
            ineligibility(&seed, &seed, &ExclusionSet::default()),
            Some(Ineligibility::SelfMatch)
        );
    }

    #[test]
    fn test_closed_profile_filtered() {
        let seed = create_profile(1, Some(99));
        let mut candidate = create_profile(2, Some(99));
        candidate.is_closed = true;
        assert_eq!(
            ineligibility(&candidate, &seed, &ExclusionSet::default()),
            Some(Ineligibility::Closed)
        );
    }

    #[test]
    fn test_exclusion_lists() {
        let seed = create_profile(1, Some(99));
        let mut exclusions = ExclusionSet::default();
        exclusions.blacklisted.insert(2);
        exclusions.favorited.insert(3);
        exclusions.previously_viewed.insert(4);

        assert_eq!(
            ineligibility(&create_profile(2, Some(99)), &seed, &exclusions),
            Some(Ineligibility::Blacklisted)
        );
        assert_eq!(
            ineligibility(&create_profile(3, Some(99)), &seed, &exclusions),
            Some(Ineligibility::Favorited)
        );
        assert_eq!(
            ineligibility(&create_profile(4, Some(99)), &seed, &exclusions),
            Some(Ineligibility::PreviouslyViewed)
        );
    }

    #[test]
    fn test_city_is_hard_filter() {
        let seed = create_profile(1, Some(99));
        assert_eq!(
            ineligibility(&create_profile(2, Some(42)), &seed, &ExclusionSet::default()),
            Some(Ineligibility::OtherCity)
        );
        assert_eq!(
            ineligibility(&create_profile(2, None), &seed, &ExclusionSet::default()),
            Some(Ineligibility::OtherCity)
        );
    }
}
