//! Shared setup for the API-level scenario tests: an in-memory application
//! and a handful of request helpers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower::ServiceExt;

use cm_api::AppState;
use cm_auth_simple::SimpleAuthProvider;
use cm_core::{AuthProvider, ForumRepo, User};
use cm_db_sqlite::SqliteForumRepo;

pub async fn app() -> (Router, AppState) {
    let repo = Arc::new(SqliteForumRepo::new("sqlite::memory:").await.unwrap());
    let auth = Arc::new(SimpleAuthProvider::new("integration-secret"));
    let state = AppState { repo, auth };
    (cm_api::router(state.clone()), state)
}

/// Provisions an account directly (signup belongs to the identity provider)
/// and returns it with a signed session token.
pub async fn register(state: &AppState, name: &str) -> (User, String) {
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

pub async fn get_json<T: DeserializeOwned>(
    app: &Router,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, Option<T>) {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).ok())
}

pub async fn send_json<B: Serialize, T: DeserializeOwned>(
    app: &Router,
    method: &str,
    uri: &str,
    body: &B,
    token: Option<&str>,
) -> (StatusCode, Option<T>) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(serde_json::to_vec(body).unwrap())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).ok())
}

/// UUID v7 ids within a millisecond are unordered; space out creations that
/// tests expect to paginate deterministically.
pub async fn tick() {
    tokio::time::sleep(std::time::Duration::from_millis(3)).await;
}
