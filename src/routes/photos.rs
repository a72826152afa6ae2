use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

use super::{error_response, validation_error, vk_error_response, AppState};
use crate::models::{
    PhotoLikeRequest, PhotoLikeResponse, PhotoLikesResponse, PhotosResponse, ProfileId, UserQuery,
};
use crate::services::PhotoRef;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/profiles/{id}/photos", web::get().to(top_photos))
        .route("/photos/like", web::post().to(toggle_like))
        .route("/photos/likes", web::get().to(list_likes));
}

/// GET /api/v1/profiles/{id}/photos
///
/// The most liked photos of a profile as message attachments.
async fn top_photos(state: web::Data<AppState>, path: web::Path<ProfileId>) -> impl Responder {
    let owner_id = path.into_inner();

    match state.vk.top_photos(owner_id, state.matching.max_photos).await {
        Ok(photos) => HttpResponse::Ok().json(PhotosResponse {
            owner_id,
            attachments: photos.iter().map(PhotoRef::attachment).collect(),
        }),
        Err(e) => {
            tracing::error!("Failed to fetch photos of {}: {}", owner_id, e);
            vk_error_response(&e)
        }
    }
}

/// POST /api/v1/photos/like
async fn toggle_like(
    state: web::Data<AppState>,
    req: web::Json<PhotoLikeRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }
    if PhotoRef::parse_attachment(&req.photo_id).is_none() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            format!("photoId must look like photo<owner>_<id>, got {}", req.photo_id),
        );
    }

    match state.postgres.toggle_photo_like(req.user_id, &req.photo_id).await {
        Ok(liked) => HttpResponse::Ok().json(PhotoLikeResponse {
            photo_id: req.photo_id.clone(),
            liked,
        }),
        Err(e) => {
            tracing::error!("Failed to toggle like on {}: {}", req.photo_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error", e.to_string())
        }
    }
}

/// GET /api/v1/photos/likes?userId={userId}
async fn list_likes(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    match state.postgres.get_photo_likes(query.user_id).await {
        Ok(likes) => HttpResponse::Ok().json(PhotoLikesResponse {
            user_id: query.user_id,
            likes,
        }),
        Err(e) => {
            tracing::error!("Failed to fetch photo likes for {}: {}", query.user_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error", e.to_string())
        }
    }
}
