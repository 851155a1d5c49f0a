//! Whiteboard service: document CRUD, sharing, and stars.
//!
//! DESIGN
//! ======
//! Every operation fetches the whiteboard first and checks the caller's role
//! before touching anything, so a denied caller never sees partial data.
//! Roles: the owner may do everything; collaborators may load, save, and
//! project; anyone may load a public board. Saves replace the whole stroke
//! list and are last-write-wins; `content.version` is bumped but never
//! compared.
//!
//! After a save commits, the whiteboard id is handed to the shared-element
//! cascade queue. The save never waits for the cascade.

use frames::Stroke;
use frames::stroke::validate_all;
use tracing::info;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::model::{UserRef, Whiteboard, now_ms};
use crate::services::cascade;
use crate::state::AppState;
use crate::store::{DocumentStore, StoreError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WhiteboardError {
    #[error("whiteboard not found: {0}")]
    NotFound(Uuid),
    #[error("access denied to whiteboard {0}")]
    AccessDenied(Uuid),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("no user with email {0:?}")]
    UserNotFound(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WhiteboardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Store(other),
        }
    }
}

impl ErrorCode for WhiteboardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_WHITEBOARD_NOT_FOUND",
            Self::AccessDenied(_) => "E_ACCESS_DENIED",
            Self::Validation(_) => "E_VALIDATION",
            Self::Conflict(_) => "E_CONFLICT",
            Self::UserNotFound(_) => "E_USER_NOT_FOUND",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.retryable())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn fetch(store: &dyn DocumentStore, id: Uuid) -> Result<Whiteboard, WhiteboardError> {
    store.get_whiteboard(id).await?.ok_or(WhiteboardError::NotFound(id))
}

async fn fetch_as_owner(store: &dyn DocumentStore, id: Uuid, viewer: Uuid) -> Result<Whiteboard, WhiteboardError> {
    let wb = fetch(store, id).await?;
    if !wb.is_owner(viewer) {
        return Err(WhiteboardError::AccessDenied(id));
    }
    Ok(wb)
}

/// Fetch a whiteboard the viewer may edit (owner or collaborator).
///
/// # Errors
///
/// `NotFound` when missing, `AccessDenied` for anyone else.
pub async fn fetch_editable(store: &dyn DocumentStore, id: Uuid, viewer: Uuid) -> Result<Whiteboard, WhiteboardError> {
    let wb = fetch(store, id).await?;
    if !wb.can_edit(viewer) {
        return Err(WhiteboardError::AccessDenied(id));
    }
    Ok(wb)
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// Create an empty whiteboard owned by `owner`.
///
/// # Errors
///
/// `Validation` for a blank name, `Conflict` when the name is taken.
pub async fn create_whiteboard(
    store: &dyn DocumentStore,
    owner: Uuid,
    name: &str,
    is_public: bool,
) -> Result<Whiteboard, WhiteboardError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WhiteboardError::Validation("whiteboard name must not be empty".into()));
    }
    let wb = Whiteboard::new(name, owner, is_public);
    store.insert_whiteboard(&wb).await?;
    info!(whiteboard_id = %wb.id, %owner, "whiteboard created");
    Ok(wb)
}

/// Load a whiteboard for display.
///
/// # Errors
///
/// `NotFound` when missing; `AccessDenied` unless the viewer is the owner, a
/// collaborator, or the board is public.
pub async fn load_whiteboard(store: &dyn DocumentStore, id: Uuid, viewer: Uuid) -> Result<Whiteboard, WhiteboardError> {
    let wb = fetch(store, id).await?;
    if !wb.can_load(viewer) {
        return Err(WhiteboardError::AccessDenied(id));
    }
    Ok(wb)
}

/// Replace the whiteboard's strokes with the caller's active history, then
/// queue the shared-element cascade.
///
/// # Errors
///
/// `NotFound`, `AccessDenied` for non-editors, `Validation` for the first
/// malformed stroke.
pub async fn save_whiteboard(
    state: &AppState,
    id: Uuid,
    viewer: Uuid,
    elements: &[Stroke],
) -> Result<Whiteboard, WhiteboardError> {
    let store = state.store.as_ref();
    fetch_editable(store, id, viewer).await?;
    validate_all(elements).map_err(|(index, e)| WhiteboardError::Validation(format!("stroke {index}: {e}")))?;

    let saved = store
        .save_content(id, elements, now_ms())
        .await?
        .ok_or(WhiteboardError::NotFound(id))?;
    info!(whiteboard_id = %id, strokes = elements.len(), version = saved.content.version, "whiteboard saved");

    cascade::enqueue(state, id);
    Ok(saved)
}

/// Whiteboards the user owns or collaborates on, most recently modified first.
///
/// # Errors
///
/// Storage failures only.
pub async fn list_for_user(store: &dyn DocumentStore, user: Uuid) -> Result<Vec<Whiteboard>, WhiteboardError> {
    Ok(store.list_whiteboards_for(user).await?)
}

/// Whiteboards the user has starred, most recently modified first.
///
/// # Errors
///
/// Storage failures only.
pub async fn list_starred(store: &dyn DocumentStore, user: Uuid) -> Result<Vec<Whiteboard>, WhiteboardError> {
    Ok(store.list_starred(user).await?)
}

/// Flip the viewer's star. Anyone who can load the board may star it.
///
/// # Errors
///
/// `NotFound` or `AccessDenied` as for [`load_whiteboard`].
pub async fn toggle_star(store: &dyn DocumentStore, id: Uuid, viewer: Uuid) -> Result<Whiteboard, WhiteboardError> {
    let wb = load_whiteboard(store, id, viewer).await?;
    let starred = !wb.is_starred_by(viewer);
    store
        .set_starred(id, viewer, starred)
        .await?
        .ok_or(WhiteboardError::NotFound(id))
}

/// Delete a whiteboard. Shared elements projected from it are left behind.
///
/// # Errors
///
/// `NotFound`, or `AccessDenied` for anyone but the owner.
pub async fn delete_whiteboard(store: &dyn DocumentStore, id: Uuid, viewer: Uuid) -> Result<(), WhiteboardError> {
    fetch_as_owner(store, id, viewer).await?;
    if !store.delete_whiteboard(id).await? {
        return Err(WhiteboardError::NotFound(id));
    }
    info!(whiteboard_id = %id, "whiteboard deleted");
    Ok(())
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Add the user with `email` as a collaborator. Re-sharing is a no-op.
///
/// # Errors
///
/// `AccessDenied` for non-owners, `UserNotFound` for an unknown email,
/// `Validation` for a blank email or the owner's own address.
pub async fn share_whiteboard(
    store: &dyn DocumentStore,
    id: Uuid,
    viewer: Uuid,
    email: &str,
) -> Result<Whiteboard, WhiteboardError> {
    let wb = fetch_as_owner(store, id, viewer).await?;
    let email = email.trim();
    if email.is_empty() {
        return Err(WhiteboardError::Validation("email must not be empty".into()));
    }
    let user = store
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| WhiteboardError::UserNotFound(email.to_owned()))?;
    if wb.is_owner(user.id) {
        return Err(WhiteboardError::Validation("the owner cannot be added as a collaborator".into()));
    }

    let updated = store
        .add_collaborator(id, user.id)
        .await?
        .ok_or(WhiteboardError::NotFound(id))?;
    info!(whiteboard_id = %id, collaborator = %user.id, "whiteboard shared");
    Ok(updated)
}

/// Revoke a collaborator.
///
/// # Errors
///
/// `NotFound`, or `AccessDenied` for anyone but the owner.
pub async fn remove_collaborator(
    store: &dyn DocumentStore,
    id: Uuid,
    viewer: Uuid,
    user: Uuid,
) -> Result<Whiteboard, WhiteboardError> {
    fetch_as_owner(store, id, viewer).await?;
    store
        .remove_collaborator(id, user)
        .await?
        .ok_or(WhiteboardError::NotFound(id))
}

/// The owner followed by each collaborator, in the order they were added.
///
/// # Errors
///
/// `NotFound` or `AccessDenied` as for [`load_whiteboard`].
pub async fn list_collaborators(
    store: &dyn DocumentStore,
    id: Uuid,
    viewer: Uuid,
) -> Result<Vec<UserRef>, WhiteboardError> {
    let wb = load_whiteboard(store, id, viewer).await?;
    let ids: Vec<Uuid> = std::iter::once(wb.owner).chain(wb.collaborators.iter().copied()).collect();
    let mut users = store.users_by_ids(&ids).await?;
    users.sort_by_key(|u| ids.iter().position(|id| *id == u.id));
    Ok(users)
}

#[cfg(test)]
#[path = "whiteboard_test.rs"]
mod tests;
