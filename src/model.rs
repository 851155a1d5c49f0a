//! Persisted document types.
//!
//! DESIGN
//! ======
//! A [`Whiteboard`] owns its strokes by value in `content.elements`. A
//! [`SharedElement`] holds a copy of some of those strokes plus the positions
//! they were copied from (`element_ids`). Positions are not identities: after
//! the source is edited, index `i` may point at a different stroke or at
//! nothing. Sync re-reads positions, it never tracks strokes.
//!
//! Timestamps are milliseconds since the Unix epoch. JSON is camelCase.

use std::time::{SystemTime, UNIX_EPOCH};

use frames::Stroke;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// USERS
// =============================================================================

/// A user as supplied by the external auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

// =============================================================================
// WHITEBOARD
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub elements: Vec<Stroke>,
    pub version: i64,
}

impl Default for Content {
    fn default() -> Self {
        Self { elements: Vec::new(), version: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Whiteboard {
    pub id: Uuid,
    pub name: String,
    pub owner: Uuid,
    pub collaborators: Vec<Uuid>,
    pub content: Content,
    pub is_public: bool,
    /// Never sent to clients; responses carry the per-viewer `isStarred`.
    #[serde(skip_serializing, default)]
    pub starred_by: Vec<Uuid>,
    pub last_modified: i64,
    pub created_at: i64,
}

impl Whiteboard {
    /// A fresh, empty whiteboard owned by `owner`.
    #[must_use]
    pub fn new(name: impl Into<String>, owner: Uuid, is_public: bool) -> Self {
        let now = now_ms();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner,
            collaborators: Vec::new(),
            content: Content::default(),
            is_public,
            starred_by: Vec::new(),
            last_modified: now,
            created_at: now,
        }
    }

    #[must_use]
    pub fn is_owner(&self, user: Uuid) -> bool {
        self.owner == user
    }

    /// Owner or collaborator: may save, project, and draw in the room.
    #[must_use]
    pub fn can_edit(&self, user: Uuid) -> bool {
        self.is_owner(user) || self.collaborators.contains(&user)
    }

    /// Editors, plus anyone when the board is public.
    #[must_use]
    pub fn can_load(&self, user: Uuid) -> bool {
        self.is_public || self.can_edit(user)
    }

    #[must_use]
    pub fn is_starred_by(&self, user: Uuid) -> bool {
        self.starred_by.contains(&user)
    }
}

/// A whiteboard as one viewer sees it: the stored document plus whether that
/// viewer has starred it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhiteboardView {
    #[serde(flatten)]
    pub whiteboard: Whiteboard,
    pub is_starred: bool,
}

impl WhiteboardView {
    #[must_use]
    pub fn for_viewer(whiteboard: Whiteboard, viewer: Uuid) -> Self {
        let is_starred = whiteboard.is_starred_by(viewer);
        Self { whiteboard, is_starred }
    }
}

// =============================================================================
// SHARED ELEMENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedElement {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub elements: Vec<Stroke>,
    /// Positions in the source's `content.elements` as of the last sync.
    pub element_ids: Vec<i64>,
    pub source_whiteboard: Uuid,
    pub shared_by: Uuid,
    pub shared_with: Vec<Uuid>,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub auto_update: bool,
    pub last_updated: i64,
    pub created_at: i64,
}

impl SharedElement {
    #[must_use]
    pub fn is_creator(&self, user: Uuid) -> bool {
        self.shared_by == user
    }

    /// Creator, a recipient, or anyone when public.
    #[must_use]
    pub fn can_view(&self, user: Uuid) -> bool {
        self.is_public || self.is_creator(user) || self.shared_with.contains(&user)
    }
}

/// Which shared elements a listing returns, relative to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareFilter {
    /// Shared with the viewer, or public.
    #[default]
    Received,
    /// Created by the viewer.
    Shared,
    Public,
    /// Created by the viewer and not public.
    Private,
    All,
}

impl ShareFilter {
    #[must_use]
    pub fn matches(self, element: &SharedElement, viewer: Uuid) -> bool {
        match self {
            Self::Received => element.shared_with.contains(&viewer) || element.is_public,
            Self::Shared => element.shared_by == viewer,
            Self::Public => element.is_public,
            Self::Private => element.shared_by == viewer && !element.is_public,
            Self::All => true,
        }
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
