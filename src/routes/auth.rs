//! Bearer-token authentication.
//!
//! Sessions are issued by an external auth layer; this server only resolves
//! an opaque token to a [`UserRef`]. REST calls send
//! `Authorization: Bearer <token>`. Browsers cannot set headers on a
//! websocket upgrade, so `/api/ws` takes the same token as `?token=`.

use axum::extract::FromRef;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use tracing::error;

use crate::model::UserRef;
use crate::routes::ApiError;
use crate::state::AppState;

/// Authenticated user extracted from the bearer token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: UserRef,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;
        let app_state = AppState::from_ref(state);
        let user = resolve_token(&app_state, token).await?;
        Ok(Self { user })
    }
}

/// The token from an `Authorization: Bearer` header, if well formed.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve a session token to its user.
///
/// # Errors
///
/// 401 for an unknown token, 500 when the store fails.
pub(crate) async fn resolve_token(state: &AppState, token: &str) -> Result<UserRef, ApiError> {
    match state.store.resolve_session(token).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(ApiError::unauthorized()),
        Err(e) => {
            error!(error = %e, "session lookup failed");
            Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, &e))
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
