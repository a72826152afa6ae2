use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use super::{error_response, rank_error_response, validation_error, vk_error_response};
use crate::config::MatchingSettings;
use crate::core::Matcher;
use crate::models::{
    BookmarkResponse, FindMatchesRequest, FindMatchesResponse, HealthResponse, MatchView, Profile,
    ProfileId, TargetRequest, UserQuery,
};
use crate::services::{CacheKey, CacheManager, PostgresClient, VkClient, VkError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub vk: Arc<VkClient>,
    pub cache: Arc<CacheManager>,
    pub postgres: Arc<PostgresClient>,
    pub matcher: Matcher,
    pub matching: MatchingSettings,
}

impl AppState {
    /// Seed profile through the cache
    pub async fn profile(&self, user_id: ProfileId) -> Result<Profile, VkError> {
        let key = CacheKey::profile(user_id);
        if let Ok(profile) = self.cache.get::<Profile>(&key).await {
            return Ok(profile);
        }

        let profile = self.vk.fetch_profile(user_id).await?;
        if let Err(e) = self.cache.set(&key, &profile).await {
            tracing::warn!("Failed to cache profile {}: {}", user_id, e);
        }
        Ok(profile)
    }

    /// Raw candidate pool through the cache
    pub async fn candidate_pool(&self, seed: &Profile) -> Result<Vec<Profile>, VkError> {
        let key = CacheKey::pool(seed.id);
        if let Ok(pool) = self.cache.get::<Vec<Profile>>(&key).await {
            return Ok(pool);
        }

        let with_groups = self.matcher.weights().groups > 0.0;
        let pool = self
            .vk
            .fetch_candidate_pool(seed, &self.matching, with_groups)
            .await?;
        if let Err(e) = self.cache.set(&key, &pool).await {
            tracing::warn!("Failed to cache candidate pool for {}: {}", seed.id, e);
        }
        Ok(pool)
    }
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches))
        .route("/matches/view", web::post().to(record_view))
        .route("/matches/view", web::delete().to(remove_view))
        .route("/matches/views", web::delete().to(clear_views));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Requested limit, never above the configured result cap
pub(crate) fn effective_cap(limit: Option<u16>, result_cap: usize) -> usize {
    limit.map(usize::from).unwrap_or(result_cap).min(result_cap)
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "userId": 123,
///   "limit": 20
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return validation_error(errors);
    }

    let user_id = req.user_id;
    let cap = effective_cap(req.limit, state.matching.result_cap);

    tracing::info!("Finding matches for user: {}, cap: {}", user_id, cap);

    let seed = match state.profile(user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!("Failed to fetch profile for {}: {}", user_id, e);
            return vk_error_response(&e);
        }
    };

    // No ranking without the exclusion lists
    let exclusions = match state.postgres.get_exclusions(user_id).await {
        Ok(exclusions) => exclusions,
        Err(e) => {
            tracing::error!("Failed to load exclusions for {}: {}", user_id, e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load exclusions",
                e.to_string(),
            );
        }
    };

    let pool = match state.candidate_pool(&seed).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to fetch candidates for {}: {}", user_id, e);
            return vk_error_response(&e);
        }
    };

    let result = match state.matcher.rank(&seed, pool, &exclusions, cap) {
        Ok(result) => result,
        Err(e) => {
            tracing::info!("Refusing to rank for {}: {}", user_id, e);
            return rank_error_response(&e);
        }
    };

    let response = FindMatchesResponse {
        total_candidates: result.total_candidates,
        eligible_candidates: result.eligible_candidates,
        matches: result.matches.into_iter().map(MatchView::from).collect(),
    };

    tracing::info!(
        "Returning {} matches for user {} (from {} candidates)",
        response.matches.len(),
        user_id,
        response.total_candidates
    );

    HttpResponse::Ok().json(response)
}

/// Record that a ranked candidate was shown
///
/// POST /api/v1/matches/view
async fn record_view(
    state: web::Data<AppState>,
    req: web::Json<TargetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.postgres.record_view(req.user_id, req.target_id).await {
        Ok(()) => HttpResponse::Ok().json(BookmarkResponse { changed: true }),
        Err(e) => {
            tracing::error!("Failed to record view {} -> {}: {}", req.user_id, req.target_id, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to record view",
                e.to_string(),
            )
        }
    }
}

/// Make a viewed candidate eligible again
///
/// DELETE /api/v1/matches/view
async fn remove_view(
    state: web::Data<AppState>,
    req: web::Json<TargetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.postgres.remove_view(req.user_id, req.target_id).await {
        Ok(changed) => HttpResponse::Ok().json(BookmarkResponse { changed }),
        Err(e) => {
            tracing::error!("Failed to remove view {} -> {}: {}", req.user_id, req.target_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error", e.to_string())
        }
    }
}

/// Start browsing from scratch
///
/// DELETE /api/v1/matches/views?userId={userId}
async fn clear_views(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    match state.postgres.clear_views(query.user_id).await {
        Ok(removed) => HttpResponse::Ok().json(serde_json::json!({
            "userId": query.user_id,
            "removed": removed,
        })),
        Err(e) => {
            tracing::error!("Failed to clear views for {}: {}", query.user_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error", e.to_string())
        }
    }
}
