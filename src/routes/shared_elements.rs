//! Shared-element REST routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::model::{ShareFilter, SharedElement};
use crate::routes::ApiError;
use crate::routes::auth::AuthUser;
use crate::routes::whiteboards::whiteboard_error_to_api;
use crate::services::shared_element::{self, ProjectRequest, SharedElementError, SyncOutcome, UpdateRequest};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type", default)]
    pub filter: ShareFilter,
}

pub(crate) fn shared_element_error_to_api(err: SharedElementError) -> ApiError {
    let status = match err {
        SharedElementError::Whiteboard(inner) => return whiteboard_error_to_api(inner),
        SharedElementError::NotFound(_) | SharedElementError::SyncStale { .. } => StatusCode::NOT_FOUND,
        SharedElementError::AccessDenied(_) => StatusCode::FORBIDDEN,
        SharedElementError::Validation(_) => StatusCode::BAD_REQUEST,
        SharedElementError::Store(ref e) => {
            error!(error = %e, "shared element storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    ApiError::new(status, &err)
}

/// `POST /api/whiteboards/:id/share-elements` — project strokes into a new
/// shared element.
pub async fn project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(whiteboard_id): Path<Uuid>,
    Json(body): Json<ProjectRequest>,
) -> Result<(StatusCode, Json<SharedElement>), ApiError> {
    let element = shared_element::project(state.store.as_ref(), whiteboard_id, auth.user.id, &body)
        .await
        .map_err(shared_element_error_to_api)?;
    Ok((StatusCode::CREATED, Json(element)))
}

/// `GET /api/shared-elements?type=received|shared|public|private|all`
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SharedElement>>, ApiError> {
    let elements = shared_element::list_for(state.store.as_ref(), auth.user.id, query.filter)
        .await
        .map_err(shared_element_error_to_api)?;
    Ok(Json(elements))
}

/// `GET /api/shared-elements/:id`
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SharedElement>, ApiError> {
    let element = shared_element::get(state.store.as_ref(), id, auth.user.id)
        .await
        .map_err(shared_element_error_to_api)?;
    Ok(Json(element))
}

/// `PUT /api/shared-elements/:id` — edit metadata.
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<SharedElement>, ApiError> {
    let element = shared_element::update(state.store.as_ref(), id, auth.user.id, &body)
        .await
        .map_err(shared_element_error_to_api)?;
    Ok(Json(element))
}

/// `DELETE /api/shared-elements/:id`
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    shared_element::delete(state.store.as_ref(), id, auth.user.id)
        .await
        .map_err(shared_element_error_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/shared-elements/:id/sync`
pub async fn sync(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SyncOutcome>, ApiError> {
    let outcome = shared_element::sync(state.store.as_ref(), id, auth.user.id)
        .await
        .map_err(shared_element_error_to_api)?;
    Ok(Json(outcome))
}

#[cfg(test)]
#[path = "shared_elements_test.rs"]
mod tests;
