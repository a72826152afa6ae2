use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to find matches
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
    #[validate(range(min = 1, max = 100))]
    #[serde(default)]
    pub limit: Option<u16>,
}

/// A seed user acting on another profile: view, favorite or blacklist
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TargetRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
    #[validate(range(min = 1))]
    #[serde(alias = "target_id", rename = "targetId")]
    pub target_id: i64,
}

/// Toggle a like on a photo attachment such as `photo123_456`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PhotoLikeRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
    #[validate(length(min = 7, max = 64))]
    #[serde(alias = "photo_id", rename = "photoId")]
    pub photo_id: String,
}

/// Query string for per-user listings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserQuery {
    #[validate(range(min = 1))]
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(default)]
    pub limit: Option<i64>,
}
