//! Per-request authorization context.
//!
//! The bearer token is resolved to a user row and folded into an explicit
//! `AuthzContext` here, once, at the edge; handlers receive the context as
//! an argument and never consult ambient session state.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use cm_core::AuthzContext;

use crate::error::ApiError;
use crate::AppState;

/// The caller, if a valid session token came with the request. Read-only
/// procedures accept anonymous callers and use this to scope the viewer's
/// vote projection.
pub struct Viewer(pub Option<AuthzContext>);

/// The caller, required. Mutations reject anonymous requests with 401.
pub struct RequireViewer(pub AuthzContext);

impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        let Some(token) = token else {
            return Ok(Viewer(None));
        };
        // An unverifiable token is treated as anonymous, not as an error;
        // the interesting failures are the authorization checks downstream.
        let Some(user_id) = state.auth.resolve_token(token) else {
            return Ok(Viewer(None));
        };
        let user = state.repo.get_user(user_id).await?;
        Ok(Viewer(user.as_ref().map(AuthzContext::for_user)))
    }
}

impl FromRequestParts<AppState> for RequireViewer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Viewer(ctx) = Viewer::from_request_parts(parts, state).await?;
        ctx.map(RequireViewer).ok_or_else(ApiError::unauthenticated)
    }
}
