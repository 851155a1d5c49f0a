//! Document storage seam.
//!
//! DESIGN
//! ======
//! Services talk to persistence only through [`DocumentStore`]. [`PgStore`]
//! backs production with PostgreSQL; [`MemoryStore`] backs tests and
//! database-less development. Both implement the same semantics:
//!
//! - Whiteboard names are unique (`StoreError::Conflict` on insert).
//! - `save_content` replaces `content.elements` wholesale, bumps
//!   `content.version`, and stamps `last_modified`. No write is ever rejected
//!   for being stale: the last save wins.
//! - Listings are newest first.
//!
//! Access control is NOT enforced here; that is the services' job.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use frames::Stroke;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::model::{ShareFilter, SharedElement, UserRef, Whiteboard};

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Conflict(_) => "E_CONFLICT",
            Self::Corrupt(_) => "E_CORRUPT_ROW",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    // --- Users ---

    /// Resolve an opaque bearer token to its user.
    async fn resolve_session(&self, token: &str) -> Result<Option<UserRef>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRef>, StoreError>;
    /// Users for the given ids, in no particular order. Unknown ids are skipped.
    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRef>, StoreError>;

    // --- Whiteboards ---

    async fn insert_whiteboard(&self, whiteboard: &Whiteboard) -> Result<(), StoreError>;
    async fn get_whiteboard(&self, id: Uuid) -> Result<Option<Whiteboard>, StoreError>;
    /// Boards the user owns or collaborates on, by `last_modified` desc.
    async fn list_whiteboards_for(&self, user: Uuid) -> Result<Vec<Whiteboard>, StoreError>;
    /// Boards the user has starred, by `last_modified` desc.
    async fn list_starred(&self, user: Uuid) -> Result<Vec<Whiteboard>, StoreError>;
    async fn save_content(&self, id: Uuid, elements: &[Stroke], now: i64) -> Result<Option<Whiteboard>, StoreError>;
    async fn set_starred(&self, id: Uuid, user: Uuid, starred: bool) -> Result<Option<Whiteboard>, StoreError>;
    async fn add_collaborator(&self, id: Uuid, user: Uuid) -> Result<Option<Whiteboard>, StoreError>;
    async fn remove_collaborator(&self, id: Uuid, user: Uuid) -> Result<Option<Whiteboard>, StoreError>;
    /// Returns `false` when nothing was deleted.
    async fn delete_whiteboard(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- Shared elements ---

    async fn insert_shared_element(&self, element: &SharedElement) -> Result<(), StoreError>;
    async fn get_shared_element(&self, id: Uuid) -> Result<Option<SharedElement>, StoreError>;
    /// Elements matching `filter` relative to `viewer`, by `created_at` desc.
    async fn list_shared_elements(&self, viewer: Uuid, filter: ShareFilter) -> Result<Vec<SharedElement>, StoreError>;
    /// Every element projected from `whiteboard_id`.
    async fn list_by_source(&self, whiteboard_id: Uuid) -> Result<Vec<SharedElement>, StoreError>;
    /// Overwrite the editable metadata (`name`, `description`, `shared_with`,
    /// `is_public`, `tags`, `auto_update`, `last_updated`).
    async fn update_shared_element(&self, element: &SharedElement) -> Result<Option<SharedElement>, StoreError>;
    /// Overwrite the projected content after a sync.
    async fn replace_shared_content(
        &self,
        id: Uuid,
        elements: &[Stroke],
        element_ids: &[i64],
        now: i64,
    ) -> Result<Option<SharedElement>, StoreError>;
    async fn delete_shared_element(&self, id: Uuid) -> Result<bool, StoreError>;
}
