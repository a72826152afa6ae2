// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BirthDate, Dimension, DimensionScore, DisplayName, ExclusionSet, Gender, GroupId, Profile,
    ProfileId, ScoredCandidate, ScoringWeights,
};
pub use requests::{FindMatchesRequest, PhotoLikeRequest, TargetRequest, UserQuery};
pub use responses::{
    BookmarkResponse, ErrorResponse, FindMatchesResponse, HealthResponse, MatchView,
    PhotoLikeResponse, PhotoLikesResponse, PhotosResponse,
};
