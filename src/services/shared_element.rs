//! Shared-element projector: copy strokes out of a whiteboard and keep the
//! copy fresh.
//!
//! DESIGN
//! ======
//! A projection copies `source.content.elements[i]` for each requested
//! index `i` and records exactly the indices it copied, so
//! `elements[k] == source.content.elements[element_ids[k]]` holds right
//! after projection and after every successful sync. Indices are positions,
//! not identities: once the source is edited the same index may name a
//! different stroke. Sync re-reads positions; it does not chase strokes.
//!
//! ERROR HANDLING
//! ==============
//! A sync that cannot produce anything (source deleted, or every index now
//! out of range) reports `SyncStale` and leaves the element as it was, so
//! recipients keep the last good copy. Indices that fell off the end during
//! an otherwise successful sync are dropped from both arrays and reported in
//! [`SyncOutcome::dropped`].

use frames::Stroke;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::model::{ShareFilter, SharedElement, now_ms};
use crate::services::whiteboard::{self, WhiteboardError};
use crate::store::{DocumentStore, StoreError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SharedElementError {
    #[error("shared element not found: {0}")]
    NotFound(Uuid),
    #[error("access denied to shared element {0}")]
    AccessDenied(Uuid),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("shared element {id} is stale: {reason}")]
    SyncStale { id: Uuid, reason: &'static str },
    #[error(transparent)]
    Whiteboard(#[from] WhiteboardError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for SharedElementError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_SHARED_ELEMENT_NOT_FOUND",
            Self::AccessDenied(_) => "E_ACCESS_DENIED",
            Self::Validation(_) => "E_VALIDATION",
            Self::SyncStale { .. } => "E_SYNC_STALE",
            Self::Whiteboard(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Whiteboard(e) => e.retryable(),
            Self::Store(e) => e.retryable(),
            _ => false,
        }
    }
}

/// Body of a projection request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectRequest {
    /// Positions in the source whiteboard's stroke list.
    pub element_ids: Vec<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub collaborator_emails: Vec<String>,
    pub is_public: bool,
    pub tags: Vec<String>,
    /// Defaults to `true`.
    pub auto_update: Option<bool>,
}

/// Partial metadata edit. Absent fields are left unchanged;
/// `collaborator_emails` replaces the whole recipient list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub auto_update: Option<bool>,
    pub collaborator_emails: Option<Vec<String>>,
}

/// Result of a successful sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub element: SharedElement,
    /// Indices that no longer exist in the source and were removed.
    pub dropped: Vec<i64>,
}

// =============================================================================
// PROJECTION
// =============================================================================

/// Copy the strokes at `ids` out of `source`. Negative and out-of-range
/// indices are skipped. Returns `(copied_ids, copied_strokes, skipped_ids)`.
fn pick(source: &[Stroke], ids: &[i64]) -> (Vec<i64>, Vec<Stroke>, Vec<i64>) {
    let mut kept = Vec::with_capacity(ids.len());
    let mut strokes = Vec::with_capacity(ids.len());
    let mut skipped = Vec::new();
    for &id in ids {
        match usize::try_from(id).ok().and_then(|i| source.get(i)) {
            Some(stroke) => {
                kept.push(id);
                strokes.push(stroke.clone());
            }
            None => skipped.push(id),
        }
    }
    (kept, strokes, skipped)
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Resolve recipient emails to user ids. Unknown addresses are skipped.
async fn resolve_emails(store: &dyn DocumentStore, emails: &[String]) -> Result<Vec<Uuid>, StoreError> {
    let mut ids = Vec::with_capacity(emails.len());
    for email in emails.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        match store.find_user_by_email(email).await? {
            Some(user) if !ids.contains(&user.id) => ids.push(user.id),
            Some(_) => {}
            None => warn!(%email, "skipping unknown collaborator email"),
        }
    }
    Ok(ids)
}

/// Project strokes of a whiteboard into a new shared element.
///
/// # Errors
///
/// `AccessDenied` unless the viewer is the owner or a collaborator of the
/// source; `Validation` when none of the requested indices are in range.
pub async fn project(
    store: &dyn DocumentStore,
    whiteboard_id: Uuid,
    viewer: Uuid,
    request: &ProjectRequest,
) -> Result<SharedElement, SharedElementError> {
    let source = whiteboard::fetch_editable(store, whiteboard_id, viewer).await?;

    let (element_ids, elements, _) = pick(&source.content.elements, &request.element_ids);
    if elements.is_empty() {
        return Err(SharedElementError::Validation("no requested element is in range".into()));
    }

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(|| format!("Shared elements from {}", source.name), str::to_owned);
    let now = now_ms();
    let element = SharedElement {
        id: Uuid::new_v4(),
        name,
        description: request.description.clone().unwrap_or_default(),
        elements,
        element_ids,
        source_whiteboard: whiteboard_id,
        shared_by: viewer,
        shared_with: resolve_emails(store, &request.collaborator_emails).await?,
        is_public: request.is_public,
        tags: clean_tags(&request.tags),
        auto_update: request.auto_update.unwrap_or(true),
        last_updated: now,
        created_at: now,
    };
    store.insert_shared_element(&element).await?;

    info!(
        shared_element_id = %element.id,
        %whiteboard_id,
        strokes = element.elements.len(),
        "shared element projected"
    );
    Ok(element)
}

// =============================================================================
// SYNC
// =============================================================================

/// Re-apply `element`'s indices to `source` and persist the result.
///
/// # Errors
///
/// `SyncStale` when no index is in range (element untouched), `NotFound` if
/// the element disappeared meanwhile.
pub async fn refresh_from(
    store: &dyn DocumentStore,
    element: &SharedElement,
    source: &[Stroke],
) -> Result<SyncOutcome, SharedElementError> {
    let (element_ids, elements, dropped) = pick(source, &element.element_ids);
    if elements.is_empty() {
        return Err(SharedElementError::SyncStale { id: element.id, reason: "no element index is in range" });
    }
    if !dropped.is_empty() {
        warn!(shared_element_id = %element.id, ?dropped, "dropping out-of-range element indices");
    }

    let element = store
        .replace_shared_content(element.id, &elements, &element_ids, now_ms())
        .await?
        .ok_or(SharedElementError::NotFound(element.id))?;
    Ok(SyncOutcome { element, dropped })
}

/// Refresh a shared element from its source whiteboard's current strokes.
///
/// # Errors
///
/// `AccessDenied` unless the viewer created the element; `SyncStale` when
/// the source is gone or none of the indices survive.
pub async fn sync(store: &dyn DocumentStore, id: Uuid, viewer: Uuid) -> Result<SyncOutcome, SharedElementError> {
    let element = fetch_as_creator(store, id, viewer).await?;
    let Some(source) = store.get_whiteboard(element.source_whiteboard).await? else {
        return Err(SharedElementError::SyncStale { id, reason: "source whiteboard no longer exists" });
    };
    refresh_from(store, &element, &source.content.elements).await
}

// =============================================================================
// CRUD
// =============================================================================

async fn fetch(store: &dyn DocumentStore, id: Uuid) -> Result<SharedElement, SharedElementError> {
    store
        .get_shared_element(id)
        .await?
        .ok_or(SharedElementError::NotFound(id))
}

async fn fetch_as_creator(store: &dyn DocumentStore, id: Uuid, viewer: Uuid) -> Result<SharedElement, SharedElementError> {
    let element = fetch(store, id).await?;
    if !element.is_creator(viewer) {
        return Err(SharedElementError::AccessDenied(id));
    }
    Ok(element)
}

/// Fetch one element the viewer may see.
///
/// # Errors
///
/// `NotFound`, or `AccessDenied` unless creator, recipient, or public.
pub async fn get(store: &dyn DocumentStore, id: Uuid, viewer: Uuid) -> Result<SharedElement, SharedElementError> {
    let element = fetch(store, id).await?;
    if !element.can_view(viewer) {
        return Err(SharedElementError::AccessDenied(id));
    }
    Ok(element)
}

/// Elements matching `filter` relative to the viewer, newest first.
///
/// # Errors
///
/// Storage failures only.
pub async fn list_for(
    store: &dyn DocumentStore,
    viewer: Uuid,
    filter: ShareFilter,
) -> Result<Vec<SharedElement>, SharedElementError> {
    Ok(store.list_shared_elements(viewer, filter).await?)
}

/// Edit metadata. Content only changes through sync.
///
/// # Errors
///
/// `AccessDenied` unless creator; `Validation` for a blank name.
pub async fn update(
    store: &dyn DocumentStore,
    id: Uuid,
    viewer: Uuid,
    request: &UpdateRequest,
) -> Result<SharedElement, SharedElementError> {
    let mut element = fetch_as_creator(store, id, viewer).await?;

    if let Some(name) = &request.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(SharedElementError::Validation("name must not be empty".into()));
        }
        name.clone_into(&mut element.name);
    }
    if let Some(description) = &request.description {
        element.description.clone_from(description);
    }
    if let Some(is_public) = request.is_public {
        element.is_public = is_public;
    }
    if let Some(tags) = &request.tags {
        element.tags = clean_tags(tags);
    }
    if let Some(auto_update) = request.auto_update {
        element.auto_update = auto_update;
    }
    if let Some(emails) = &request.collaborator_emails {
        element.shared_with = resolve_emails(store, emails).await?;
    }
    element.last_updated = now_ms();

    store
        .update_shared_element(&element)
        .await?
        .ok_or(SharedElementError::NotFound(id))
}

/// Delete an element.
///
/// # Errors
///
/// `NotFound`, or `AccessDenied` unless creator.
pub async fn delete(store: &dyn DocumentStore, id: Uuid, viewer: Uuid) -> Result<(), SharedElementError> {
    fetch_as_creator(store, id, viewer).await?;
    if !store.delete_shared_element(id).await? {
        return Err(SharedElementError::NotFound(id));
    }
    info!(shared_element_id = %id, "shared element deleted");
    Ok(())
}

#[cfg(test)]
#[path = "shared_element_test.rs"]
mod tests;
