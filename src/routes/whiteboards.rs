//! Whiteboard REST routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use frames::Stroke;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::model::{UserRef, WhiteboardView};
use crate::routes::ApiError;
use crate::routes::auth::AuthUser;
use crate::services::whiteboard::{self, WhiteboardError};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Deserialize)]
pub struct SaveBody {
    pub content: SaveContent,
}

#[derive(Deserialize)]
pub struct SaveContent {
    pub elements: Vec<Stroke>,
}

#[derive(Deserialize)]
pub struct ShareBody {
    pub email: String,
}

pub(crate) fn whiteboard_error_to_api(err: WhiteboardError) -> ApiError {
    let status = match &err {
        WhiteboardError::NotFound(_) | WhiteboardError::UserNotFound(_) => StatusCode::NOT_FOUND,
        WhiteboardError::AccessDenied(_) => StatusCode::FORBIDDEN,
        WhiteboardError::Validation(_) => StatusCode::BAD_REQUEST,
        WhiteboardError::Conflict(_) => StatusCode::CONFLICT,
        WhiteboardError::Store(e) => {
            error!(error = %e, "whiteboard storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    ApiError::new(status, &err)
}

/// `POST /api/whiteboards` — create an empty whiteboard.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateBody>,
) -> Result<(StatusCode, Json<WhiteboardView>), ApiError> {
    let wb = whiteboard::create_whiteboard(state.store.as_ref(), auth.user.id, &body.name, body.is_public)
        .await
        .map_err(whiteboard_error_to_api)?;
    Ok((StatusCode::CREATED, Json(WhiteboardView::for_viewer(wb, auth.user.id))))
}

/// `GET /api/whiteboards` — boards the caller owns or collaborates on.
pub async fn list(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<WhiteboardView>>, ApiError> {
    let boards = whiteboard::list_for_user(state.store.as_ref(), auth.user.id)
        .await
        .map_err(whiteboard_error_to_api)?;
    Ok(Json(
        boards
            .into_iter()
            .map(|wb| WhiteboardView::for_viewer(wb, auth.user.id))
            .collect(),
    ))
}

/// `GET /api/whiteboards/starred`
pub async fn list_starred(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<WhiteboardView>>, ApiError> {
    let boards = whiteboard::list_starred(state.store.as_ref(), auth.user.id)
        .await
        .map_err(whiteboard_error_to_api)?;
    Ok(Json(
        boards
            .into_iter()
            .map(|wb| WhiteboardView::for_viewer(wb, auth.user.id))
            .collect(),
    ))
}

/// `GET /api/whiteboards/:id`
pub async fn load(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<WhiteboardView>, ApiError> {
    let wb = whiteboard::load_whiteboard(state.store.as_ref(), id, auth.user.id)
        .await
        .map_err(whiteboard_error_to_api)?;
    Ok(Json(WhiteboardView::for_viewer(wb, auth.user.id)))
}

/// `PUT /api/whiteboards/:id` — replace the strokes and trigger the cascade.
pub async fn save(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SaveBody>,
) -> Result<Json<WhiteboardView>, ApiError> {
    let wb = whiteboard::save_whiteboard(&state, id, auth.user.id, &body.content.elements)
        .await
        .map_err(whiteboard_error_to_api)?;
    Ok(Json(WhiteboardView::for_viewer(wb, auth.user.id)))
}

/// `DELETE /api/whiteboards/:id`
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    whiteboard::delete_whiteboard(state.store.as_ref(), id, auth.user.id)
        .await
        .map_err(whiteboard_error_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/whiteboards/:id/star`
pub async fn toggle_star(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<WhiteboardView>, ApiError> {
    let wb = whiteboard::toggle_star(state.store.as_ref(), id, auth.user.id)
        .await
        .map_err(whiteboard_error_to_api)?;
    Ok(Json(WhiteboardView::for_viewer(wb, auth.user.id)))
}

/// `POST /api/whiteboards/:id/share` — add a collaborator by email.
pub async fn share(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ShareBody>,
) -> Result<Json<WhiteboardView>, ApiError> {
    let wb = whiteboard::share_whiteboard(state.store.as_ref(), id, auth.user.id, &body.email)
        .await
        .map_err(whiteboard_error_to_api)?;
    Ok(Json(WhiteboardView::for_viewer(wb, auth.user.id)))
}

/// `GET /api/whiteboards/:id/collaborators`
pub async fn list_collaborators(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<UserRef>>, ApiError> {
    let users = whiteboard::list_collaborators(state.store.as_ref(), id, auth.user.id)
        .await
        .map_err(whiteboard_error_to_api)?;
    Ok(Json(users))
}

/// `DELETE /api/whiteboards/:id/collaborators/:user_id`
pub async fn remove_collaborator(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<WhiteboardView>, ApiError> {
    let wb = whiteboard::remove_collaborator(state.store.as_ref(), id, auth.user.id, user_id)
        .await
        .map_err(whiteboard_error_to_api)?;
    Ok(Json(WhiteboardView::for_viewer(wb, auth.user.id)))
}

#[cfg(test)]
#[path = "whiteboards_test.rs"]
mod tests;
