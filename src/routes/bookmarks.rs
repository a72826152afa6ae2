use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

use super::{error_response, validation_error, AppState};
use crate::models::{BookmarkResponse, ProfileId, TargetRequest, UserQuery};

const DEFAULT_FAVORITES_LIMIT: i64 = 100;

/// Favorites and blacklist routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/favorites", web::post().to(add_favorite))
        .route("/favorites", web::delete().to(remove_favorite))
        .route("/favorites", web::get().to(list_favorites))
        .route("/favorites/{target_id}", web::get().to(is_favorite))
        .route("/blacklist", web::post().to(add_to_blacklist))
        .route("/blacklist", web::delete().to(remove_from_blacklist))
        .route("/blacklist", web::get().to(get_blacklist));
}

fn changed(result: Result<bool, crate::services::PostgresError>, action: &str) -> HttpResponse {
    match result {
        Ok(changed) => HttpResponse::Ok().json(BookmarkResponse { changed }),
        Err(e) => {
            tracing::error!("Failed to {}: {}", action, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error", e.to_string())
        }
    }
}

/// A user can neither favorite nor blacklist themselves
fn reject_self(req: &TargetRequest, action: &str) -> Option<HttpResponse> {
    (req.user_id == req.target_id).then(|| {
        error_response(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            format!("cannot {} yourself", action),
        )
    })
}

/// POST /api/v1/favorites
async fn add_favorite(state: web::Data<AppState>, req: web::Json<TargetRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }
    if let Some(rejection) = reject_self(&req, "favorite") {
        return rejection;
    }

    changed(state.postgres.add_favorite(req.user_id, req.target_id).await, "add favorite")
}

/// DELETE /api/v1/favorites
async fn remove_favorite(
    state: web::Data<AppState>,
    req: web::Json<TargetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    changed(state.postgres.remove_favorite(req.user_id, req.target_id).await, "remove favorite")
}

/// GET /api/v1/favorites?userId={userId}&limit={limit}
async fn list_favorites(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    let limit = query.limit.unwrap_or(DEFAULT_FAVORITES_LIMIT).clamp(1, 1000);

    match state.postgres.list_favorites(query.user_id, limit).await {
        Ok(favorites) => HttpResponse::Ok().json(serde_json::json!({
            "userId": query.user_id,
            "favorites": favorites,
            "count": favorites.len(),
        })),
        Err(e) => {
            tracing::error!("Failed to fetch favorites for {}: {}", query.user_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error", e.to_string())
        }
    }
}

/// GET /api/v1/favorites/{targetId}?userId={userId}
async fn is_favorite(
    state: web::Data<AppState>,
    path: web::Path<ProfileId>,
    query: web::Query<UserQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    let target_id = path.into_inner();

    match state.postgres.is_favorite(query.user_id, target_id).await {
        Ok(favorite) => HttpResponse::Ok().json(serde_json::json!({
            "userId": query.user_id,
            "targetId": target_id,
            "favorite": favorite,
        })),
        Err(e) => {
            tracing::error!("Failed to check favorite {} -> {}: {}", query.user_id, target_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error", e.to_string())
        }
    }
}

/// POST /api/v1/blacklist
async fn add_to_blacklist(
    state: web::Data<AppState>,
    req: web::Json<TargetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    if let Some(rejection) = reject_self(&req, "blacklist") {
        return rejection;
    }

    changed(state.postgres.add_to_blacklist(req.user_id, req.target_id).await, "blacklist")
}

/// DELETE /api/v1/blacklist
async fn remove_from_blacklist(
    state: web::Data<AppState>,
    req: web::Json<TargetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    changed(state.postgres.remove_from_blacklist(req.user_id, req.target_id).await, "unblacklist")
}

/// GET /api/v1/blacklist?userId={userId}
async fn get_blacklist(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    match state.postgres.get_blacklist(query.user_id).await {
        Ok(banned) => HttpResponse::Ok().json(serde_json::json!({
            "userId": query.user_id,
            "blacklist": banned,
            "count": banned.len(),
        })),
        Err(e) => {
            tracing::error!("Failed to fetch blacklist for {}: {}", query.user_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error", e.to_string())
        }
    }
}
