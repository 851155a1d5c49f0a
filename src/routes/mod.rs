//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the REST API for whiteboards and shared elements, the
//! realtime websocket, and a liveness probe under a single Axum router.
//! Every failure leaves the API as a JSON body `{ "code": "E_…", "message": … }`
//! built by [`ApiError`].

pub mod auth;
pub mod shared_elements;
pub mod whiteboards;
pub mod ws;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post, put};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, warn};

use crate::error::ErrorCode;
use crate::state::AppState;

// =============================================================================
// API ERROR
// =============================================================================

/// Error response: an HTTP status plus the service error's code and message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, err: &impl ErrorCode) -> Self {
        Self { status, code: err.error_code(), message: err.to_string() }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self { status: StatusCode::UNAUTHORIZED, code: "E_UNAUTHORIZED", message: "missing or invalid token".into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "code": self.code, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

// =============================================================================
// ROUTER
// =============================================================================

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origin = match allow_origin.map(HeaderValue::from_str) {
        None => AllowOrigin::from(Any),
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(e)) => {
            warn!(error = %e, "invalid CORS_ALLOW_ORIGIN; allowing any origin");
            AllowOrigin::from(Any)
        }
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Request span without the query string: `/api/ws` carries the session
/// token as `?token=`.
fn request_span<B>(request: &Request<B>) -> Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allow_origin.as_deref());

    Router::new()
        .route("/api/whiteboards", get(whiteboards::list).post(whiteboards::create))
        .route("/api/whiteboards/starred", get(whiteboards::list_starred))
        .route(
            "/api/whiteboards/{id}",
            get(whiteboards::load)
                .put(whiteboards::save)
                .delete(whiteboards::delete),
        )
        .route("/api/whiteboards/{id}/star", put(whiteboards::toggle_star))
        .route("/api/whiteboards/{id}/share", post(whiteboards::share))
        .route("/api/whiteboards/{id}/collaborators", get(whiteboards::list_collaborators))
        .route(
            "/api/whiteboards/{id}/collaborators/{user_id}",
            delete(whiteboards::remove_collaborator),
        )
        .route("/api/whiteboards/{id}/share-elements", post(shared_elements::project))
        .route("/api/shared-elements", get(shared_elements::list))
        .route(
            "/api/shared-elements/{id}",
            get(shared_elements::get)
                .put(shared_elements::update)
                .delete(shared_elements::delete),
        )
        .route("/api/shared-elements/{id}/sync", post(shared_elements::sync))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http().make_span_with(request_span::<Body>))
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
