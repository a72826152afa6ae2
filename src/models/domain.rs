use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Opaque VK user identifier
pub type ProfileId = i64;

/// Opaque VK group identifier
pub type GroupId = i64;

/// Gender as reported by the social API (`sex`: 0 unknown, 1 female, 2 male)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Unknown,
    Female,
    Male,
}

impl Gender {
    pub fn from_vk_code(code: u8) -> Self {
        match code {
            1 => Gender::Female,
            2 => Gender::Male,
            _ => Gender::Unknown,
        }
    }

    pub fn vk_code(self) -> u8 {
        match self {
            Gender::Unknown => 0,
            Gender::Female => 1,
            Gender::Male => 2,
        }
    }

    /// The gender searched for on behalf of a seed user
    pub fn opposite(self) -> Option<Gender> {
        match self {
            Gender::Female => Some(Gender::Male),
            Gender::Male => Some(Gender::Female),
            Gender::Unknown => None,
        }
    }
}

/// Possibly partial birth date. VK hides the year when the user asks it to,
/// so `"14.2"` is as valid as `"14.2.1994"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthDate {
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl BirthDate {
    /// Parse a `D.M.YYYY` / `D.M` string. Unparseable components are dropped
    /// rather than failing the whole date; `None` when nothing survives.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split('.');
        let day = parts
            .next()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|d| (1..=31).contains(d));
        let month = parts
            .next()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|m| (1..=12).contains(m));
        let year = parts
            .next()
            .and_then(|p| p.trim().parse::<i32>().ok())
            .filter(|y| *y > 1900);

        if day.is_none() && month.is_none() && year.is_none() {
            return None;
        }

        Some(Self { day, month, year })
    }

    /// Age in full years on `today`. Without day/month the birthday is
    /// assumed to have passed already.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let year = self.year?;
        let mut age = today.year() - year;
        if let (Some(month), Some(day)) = (self.month, self.day) {
            if (today.month(), today.day()) < (month, day) {
                age -= 1;
            }
        }
        u32::try_from(age).ok()
    }
}

/// First/last name pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName {
    #[serde(rename = "firstName")]
    pub first: String,
    #[serde(rename = "lastName")]
    pub last: String,
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.last)
    }
}

/// A person as returned by the social API, validated once at the client boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: DisplayName,
    /// Public short name, e.g. `durov` in `https://vk.com/durov`
    pub handle: String,
    pub gender: Gender,
    #[serde(rename = "birthDate", default)]
    pub birth_date: Option<BirthDate>,
    #[serde(rename = "cityId", default)]
    pub city_id: Option<i64>,
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(default)]
    pub music: Option<String>,
    #[serde(default)]
    pub books: Option<String>,
    #[serde(default)]
    pub groups: BTreeSet<GroupId>,
    #[serde(rename = "isClosed", default)]
    pub is_closed: bool,
}

impl Profile {
    pub fn birth_year(&self) -> Option<i32> {
        self.birth_date.and_then(|b| b.year)
    }

    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.birth_date.and_then(|b| b.age_on(today))
    }

    /// Age as of the current UTC date
    pub fn age(&self) -> Option<u32> {
        self.age_on(chrono::Utc::now().date_naive())
    }

    pub fn profile_link(&self) -> String {
        format!("https://vk.com/{}", self.handle)
    }
}

/// Identities a seed user must never be shown again
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionSet {
    pub blacklisted: HashSet<ProfileId>,
    pub favorited: HashSet<ProfileId>,
    #[serde(rename = "previouslyViewed")]
    pub previously_viewed: HashSet<ProfileId>,
}

impl ExclusionSet {
    pub fn contains(&self, id: ProfileId) -> bool {
        self.blacklisted.contains(&id)
            || self.favorited.contains(&id)
            || self.previously_viewed.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.blacklisted.is_empty()
            && self.favorited.is_empty()
            && self.previously_viewed.is_empty()
    }
}

/// One scored attribute axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Age,
    City,
    Interests,
    Music,
    Books,
    Groups,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Age,
        Dimension::City,
        Dimension::Interests,
        Dimension::Music,
        Dimension::Books,
        Dimension::Groups,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Age => "age",
            Dimension::City => "city",
            Dimension::Interests => "interests",
            Dimension::Music => "music",
            Dimension::Books => "books",
            Dimension::Groups => "groups",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-dimension weights. They need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub age: f64,
    pub city: f64,
    pub interests: f64,
    pub music: f64,
    pub books: f64,
    pub groups: f64,
}

impl ScoringWeights {
    /// All weights zero; useful as a starting point for single-dimension rankings
    pub fn zero() -> Self {
        Self {
            age: 0.0,
            city: 0.0,
            interests: 0.0,
            music: 0.0,
            books: 0.0,
            groups: 0.0,
        }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Age => self.age,
            Dimension::City => self.city,
            Dimension::Interests => self.interests,
            Dimension::Music => self.music,
            Dimension::Books => self.books,
            Dimension::Groups => self.groups,
        }
    }

    pub fn with(mut self, dimension: Dimension, weight: f64) -> Self {
        match dimension {
            Dimension::Age => self.age = weight,
            Dimension::City => self.city = weight,
            Dimension::Interests => self.interests = weight,
            Dimension::Music => self.music = weight,
            Dimension::Books => self.books = weight,
            Dimension::Groups => self.groups = weight,
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            age: 0.3,
            city: 0.2,
            interests: 0.2,
            music: 0.1,
            books: 0.1,
            groups: 0.1,
        }
    }
}

/// Contribution of a single evaluated dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub partial: f64,
    pub weighted: f64,
}

/// A candidate with its total score. Produced per ranking call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub score: f64,
    pub profile: Profile,
    /// Only dimensions with a positive weight appear here
    pub breakdown: Vec<DimensionScore>,
}
