//! VK Matchmaker - candidate ranking service for a VK dating bot
//!
//! This library ranks profiles returned by the VK search API against a seed
//! user and keeps the per-user favorites, blacklist, photo likes and view
//! history that the ranking excludes.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{rank, similarity, MatchResult, Matcher, RankError};
pub use models::{
    ExclusionSet, FindMatchesRequest, FindMatchesResponse, Profile, ScoredCandidate,
    ScoringWeights,
};
