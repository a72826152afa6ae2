// Core algorithm exports
pub mod filters;
pub mod matcher;
pub mod scoring;
pub mod similarity;

pub use filters::{ineligibility, is_eligible, Ineligibility};
pub use matcher::{deduplicate, rank, validate_weights, MatchResult, Matcher, RankError};
pub use scoring::{calculate_match_score, partial_score};
pub use similarity::{jaccard, similarity, tokenize};
