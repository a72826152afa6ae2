use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::domain::{DimensionScore, ProfileId, ScoredCandidate};

/// A ranked candidate as presented to the bot front-end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchView {
    #[serde(rename = "userId")]
    pub user_id: ProfileId,
    pub name: String,
    #[serde(rename = "profileLink")]
    pub profile_link: String,
    pub age: Option<u32>,
    #[serde(rename = "cityId")]
    pub city_id: Option<i64>,
    #[serde(rename = "matchScore")]
    pub match_score: f64,
    pub breakdown: Vec<DimensionScore>,
}

impl From<ScoredCandidate> for MatchView {
    fn from(candidate: ScoredCandidate) -> Self {
        let profile = candidate.profile;
        Self {
            user_id: profile.id,
            name: profile.name.to_string(),
            profile_link: profile.profile_link(),
            age: profile.age(),
            city_id: profile.city_id,
            match_score: candidate.score,
            breakdown: candidate.breakdown,
        }
    }
}

/// Response for find matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindMatchesResponse {
    pub matches: Vec<MatchView>,
    pub total_candidates: usize,
    pub eligible_candidates: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Outcome of an add/remove on one of the per-user lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkResponse {
    pub changed: bool,
}

/// Top photos of a profile, ready to attach to a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotosResponse {
    pub owner_id: ProfileId,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoLikeResponse {
    pub photo_id: String,
    pub liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoLikesResponse {
    pub user_id: ProfileId,
    pub likes: HashMap<String, bool>,
}
