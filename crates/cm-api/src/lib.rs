//! # cm-api
//!
//! The web routing and orchestration layer for commune.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use cm_core::{AuthProvider, ForumRepo};

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ForumRepo>,
    pub auth: Arc<dyn AuthProvider>,
}

/// Builds the full application router.
///
/// The API lives under `/api` so the main binary can mount other surfaces
/// (static assets, health checks) beside it.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", procedures())
        .layer(middleware::cors_policy())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn procedures() -> Router<AppState> {
    Router::new()
        // Posts
        .route("/posts", get(handlers::get_posts).post(handlers::create_post))
        .route(
            "/posts/{id}",
            get(handlers::get_post).put(handlers::edit_post).delete(handlers::nuke_post),
        )
        .route("/posts/{id}/vote", post(handlers::like_post))
        .route("/posts/{id}/deleted", post(handlers::set_post_deleted))
        .route("/posts/{id}/comments", get(handlers::get_comments))
        // Comments
        .route("/comments", post(handlers::create_comment))
        .route(
            "/comments/{id}",
            put(handlers::edit_comment).delete(handlers::nuke_comment),
        )
        .route("/comments/{id}/vote", post(handlers::like_comment))
        .route("/comments/{id}/deleted", post(handlers::set_comment_deleted))
        // Communities
        .route(
            "/communities",
            get(handlers::find_community).post(handlers::create_community),
        )
        .route(
            "/communities/{name}",
            get(handlers::get_community).put(handlers::edit_community),
        )
        .route("/communities/{name}/rules", put(handlers::edit_community_rules))
        .route("/communities/{name}/moderators", post(handlers::add_moderator))
        .route(
            "/communities/{name}/moderators/{user_id}",
            axum::routing::delete(handlers::remove_moderator),
        )
        .route("/communities/{name}/transfer", post(handlers::transfer_community))
        // Moderation
        .route("/users/{id}/ban", post(handlers::ban_user))
        // Search and notifications
        .route("/search", get(handlers::search))
        .route("/notifications", get(handlers::get_notifications))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use cm_auth_simple::SimpleAuthProvider;
    use cm_core::{AuthProvider, ForumRepo, Page, Post, User};
    use cm_db_sqlite::SqliteForumRepo;
    use tower::ServiceExt;

    async fn app() -> (Router, AppState) {
        let repo = Arc::new(SqliteForumRepo::new("sqlite::memory:").await.unwrap());
        let auth = Arc::new(SimpleAuthProvider::new("test-secret"));
        let state = AppState { repo, auth };
        (router(state.clone()), state)
    }

    async fn logged_in_user(state: &AppState, name: &str) -> (User, String) {
        let user = User {
            id: uuid::Uuid::now_v7(),
            name: name.to_string(),
            image: None,
            banned_until: None,
            is_global_moderator: false,
            created_at: chrono::Utc::now(),
        };
        state.repo.create_user(user.clone()).await.unwrap();
        let token = state.auth.issue_token(user.id);
        (user, token)
    }

    #[tokio::test]
    async fn test_get_posts_empty_listing() {
        let (app, _) = app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/posts?sort=new&count=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page: Page<Post> = serde_json::from_slice(&bytes).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_count_bounds_are_enforced() {
        let (app, _) = app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/posts?sort=new&count=51")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mutations_require_a_session() {
        let (app, _) = app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/communities")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"cats"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_community_name_validation_at_the_edge() {
        let (app, state) = app().await;
        let (_, token) = logged_in_user(&state, "alice").await;

        let request = |name: &str, token: &str| {
            Request::builder()
                .method("POST")
                .uri("/api/communities")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(format!(r#"{{"name":"{name}"}}"#)))
                .unwrap()
        };

        let rejected = app.clone().oneshot(request("Ab 1", &token)).await.unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        let accepted = app.clone().oneshot(request("ab_1", &token)).await.unwrap();
        assert_eq!(accepted.status(), StatusCode::OK);

        // The name is unique; a second creation conflicts.
        let duplicate = app.oneshot(request("ab_1", &token)).await.unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    }
}
