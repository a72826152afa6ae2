// Route exports
pub mod bookmarks;
pub mod matches;
pub mod photos;

use actix_web::{http::StatusCode, web, HttpResponse};

use crate::core::RankError;
use crate::models::ErrorResponse;
use crate::services::VkError;

pub use matches::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(bookmarks::configure)
            .configure(photos::configure),
    );
}

pub(crate) fn error_response(status: StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

pub(crate) fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string())
}

/// Status code a social API failure surfaces as
pub fn vk_error_status(error: &VkError) -> StatusCode {
    match error {
        VkError::NotFound(_) => StatusCode::NOT_FOUND,
        VkError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        VkError::IncompleteSeed(..) => StatusCode::UNPROCESSABLE_ENTITY,
        VkError::Unauthorized { .. }
        | VkError::Api { .. }
        | VkError::RequestError(_)
        | VkError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn vk_error_response(error: &VkError) -> HttpResponse {
    error_response(vk_error_status(error), "Social API request failed", error.to_string())
}

pub(crate) fn rank_error_response(error: &RankError) -> HttpResponse {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, "Cannot rank candidates", error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingSettings;
    use crate::core::Matcher;
    use crate::models::Profile;
    use crate::services::{CacheKey, CacheManager, PostgresClient, VkClient};
    use actix_web::App;
    use std::sync::Arc;
    use std::time::Duration;

    /// State whose social API and store are both unreachable
    async fn create_state(cached: &[Profile]) -> AppState {
        let vk = VkClient::new(
            "http://127.0.0.1:9".to_string(),
            "token".to_string(),
            "5.131".to_string(),
            Duration::from_secs(1),
            Duration::ZERO,
        )
        .unwrap();

        let cache = CacheManager::in_memory(100, 60);
        for profile in cached {
            cache.set(&CacheKey::profile(profile.id), profile).await.unwrap();
        }

        let postgres = PostgresClient::connect_lazy(
            "postgres://vk:vk@127.0.0.1:1/vk_matchmaker",
            Duration::from_millis(300),
        )
        .unwrap();

        AppState {
            vk: Arc::new(vk),
            cache: Arc::new(cache),
            postgres: Arc::new(postgres),
            matcher: Matcher::default(),
            matching: MatchingSettings::default(),
        }
    }

    async fn call(
        state: AppState,
        req: actix_web::test::TestRequest,
    ) -> (StatusCode, ErrorResponse) {
        let app = actix_web::test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let resp = actix_web::test::call_service(&app, req.to_request()).await;
        let status = resp.status();
        let body: ErrorResponse = actix_web::test::read_body_json(resp).await;
        (status, body)
    }

    #[test]
    fn test_effective_cap() {
        assert_eq!(matches::effective_cap(None, 100), 100);
        assert_eq!(matches::effective_cap(Some(20), 100), 20);
        assert_eq!(matches::effective_cap(Some(80), 50), 50);
    }

    #[actix_web::test]
    async fn test_find_matches_fails_without_exclusions() {
        let seed = Profile {
            id: 5,
            city_id: Some(1),
            ..Default::default()
        };
        let state = create_state(&[seed]).await;

        let req = actix_web::test::TestRequest::post()
            .uri("/api/v1/matches/find")
            .set_json(serde_json::json!({"userId": 5, "limit": 10}));
        let (status, body) = call(state, req).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Failed to load exclusions");
        assert_eq!(body.status_code, 500);
    }

    #[actix_web::test]
    async fn test_find_matches_rejects_limit_above_maximum() {
        let state = create_state(&[]).await;

        let req = actix_web::test::TestRequest::post()
            .uri("/api/v1/matches/find")
            .set_json(serde_json::json!({"userId": 5, "limit": 101}));
        let (status, body) = call(state, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Validation failed");
    }

    #[actix_web::test]
    async fn test_listings_reject_non_positive_user() {
        let requests = [
            actix_web::test::TestRequest::get().uri("/api/v1/favorites?userId=0"),
            actix_web::test::TestRequest::get().uri("/api/v1/favorites/7?userId=-2"),
            actix_web::test::TestRequest::get().uri("/api/v1/blacklist?userId=0"),
            actix_web::test::TestRequest::get().uri("/api/v1/photos/likes?userId=-1"),
            actix_web::test::TestRequest::delete().uri("/api/v1/matches/views?userId=0"),
        ];

        for req in requests {
            let (status, body) = call(create_state(&[]).await, req).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body.error, "Validation failed");
        }
    }

    #[actix_web::test]
    async fn test_cannot_bookmark_yourself() {
        for uri in ["/api/v1/favorites", "/api/v1/blacklist"] {
            let req = actix_web::test::TestRequest::post()
                .uri(uri)
                .set_json(serde_json::json!({"userId": 3, "targetId": 3}));
            let (status, body) = call(create_state(&[]).await, req).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body.message.contains("yourself"), "{}", body.message);
        }
    }

    #[test]
    fn test_vk_error_status() {
        assert_eq!(vk_error_status(&VkError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            vk_error_status(&VkError::RateLimited { retry_after_secs: 1 }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            vk_error_status(&VkError::IncompleteSeed(1, "a city")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(vk_error_status(&VkError::Unauthorized { code: 5 }), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_error_response_status() {
        let response = rank_error_response(&RankError::InvalidCap);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
