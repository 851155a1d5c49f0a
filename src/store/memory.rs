//! In-memory [`DocumentStore`].
//!
//! Used by the test suite and when the server starts without `DATABASE_URL`.
//! Rows live in insertion-ordered vectors behind one `RwLock`, so listings
//! are deterministic even when timestamps tie.

use std::collections::HashMap;

use async_trait::async_trait;
use frames::Stroke;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, StoreError};
use crate::model::{ShareFilter, SharedElement, UserRef, Whiteboard};

#[derive(Default)]
struct Inner {
    users: Vec<UserRef>,
    sessions: HashMap<String, Uuid>,
    whiteboards: Vec<Whiteboard>,
    shared: Vec<SharedElement>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and a session token for it. Stands in for the
    /// external auth layer.
    pub async fn add_user(&self, name: &str, email: &str, token: &str) -> UserRef {
        let user = UserRef { id: Uuid::new_v4(), name: name.to_owned(), email: email.to_owned() };
        let mut inner = self.inner.write().await;
        inner.users.push(user.clone());
        inner.sessions.insert(token.to_owned(), user.id);
        user
    }
}

/// Newest first; ties go to the later insertion.
fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>, key: impl Fn(&T) -> i64) -> Vec<T> {
    let mut out: Vec<T> = rows.rev().collect();
    out.sort_by_key(|row| std::cmp::Reverse(key(row)));
    out
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn resolve_session(&self, token: &str) -> Result<Option<UserRef>, StoreError> {
        let inner = self.inner.read().await;
        let Some(user_id) = inner.sessions.get(token) else {
            return Ok(None);
        };
        Ok(inner.users.iter().find(|u| u.id == *user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRef>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRef>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn insert_whiteboard(&self, whiteboard: &Whiteboard) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.whiteboards.iter().any(|w| w.name == whiteboard.name) {
            return Err(StoreError::Conflict(format!("whiteboard name {:?} is taken", whiteboard.name)));
        }
        inner.whiteboards.push(whiteboard.clone());
        Ok(())
    }

    async fn get_whiteboard(&self, id: Uuid) -> Result<Option<Whiteboard>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.whiteboards.iter().find(|w| w.id == id).cloned())
    }

    async fn list_whiteboards_for(&self, user: Uuid) -> Result<Vec<Whiteboard>, StoreError> {
        let inner = self.inner.read().await;
        let rows = inner.whiteboards.iter().filter(|w| w.can_edit(user)).cloned();
        Ok(newest_first(rows, |w| w.last_modified))
    }

    async fn list_starred(&self, user: Uuid) -> Result<Vec<Whiteboard>, StoreError> {
        let inner = self.inner.read().await;
        let rows = inner.whiteboards.iter().filter(|w| w.is_starred_by(user)).cloned();
        Ok(newest_first(rows, |w| w.last_modified))
    }

    async fn save_content(&self, id: Uuid, elements: &[Stroke], now: i64) -> Result<Option<Whiteboard>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(wb) = inner.whiteboards.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };
        wb.content.elements = elements.to_vec();
        wb.content.version += 1;
        wb.last_modified = now;
        Ok(Some(wb.clone()))
    }

    async fn set_starred(&self, id: Uuid, user: Uuid, starred: bool) -> Result<Option<Whiteboard>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(wb) = inner.whiteboards.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };
        wb.starred_by.retain(|u| *u != user);
        if starred {
            wb.starred_by.push(user);
        }
        Ok(Some(wb.clone()))
    }

    async fn add_collaborator(&self, id: Uuid, user: Uuid) -> Result<Option<Whiteboard>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(wb) = inner.whiteboards.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };
        if !wb.collaborators.contains(&user) {
            wb.collaborators.push(user);
        }
        Ok(Some(wb.clone()))
    }

    async fn remove_collaborator(&self, id: Uuid, user: Uuid) -> Result<Option<Whiteboard>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(wb) = inner.whiteboards.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };
        wb.collaborators.retain(|u| *u != user);
        Ok(Some(wb.clone()))
    }

    async fn delete_whiteboard(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.whiteboards.len();
        inner.whiteboards.retain(|w| w.id != id);
        Ok(inner.whiteboards.len() != before)
    }

    async fn insert_shared_element(&self, element: &SharedElement) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.shared.iter().any(|e| e.id == element.id) {
            return Err(StoreError::Conflict(format!("shared element {} exists", element.id)));
        }
        inner.shared.push(element.clone());
        Ok(())
    }

    async fn get_shared_element(&self, id: Uuid) -> Result<Option<SharedElement>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.shared.iter().find(|e| e.id == id).cloned())
    }

    async fn list_shared_elements(&self, viewer: Uuid, filter: ShareFilter) -> Result<Vec<SharedElement>, StoreError> {
        let inner = self.inner.read().await;
        let rows = inner.shared.iter().filter(|e| filter.matches(e, viewer)).cloned();
        Ok(newest_first(rows, |e| e.created_at))
    }

    async fn list_by_source(&self, whiteboard_id: Uuid) -> Result<Vec<SharedElement>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .shared
            .iter()
            .filter(|e| e.source_whiteboard == whiteboard_id)
            .cloned()
            .collect())
    }

    async fn update_shared_element(&self, element: &SharedElement) -> Result<Option<SharedElement>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(row) = inner.shared.iter_mut().find(|e| e.id == element.id) else {
            return Ok(None);
        };
        row.name.clone_from(&element.name);
        row.description.clone_from(&element.description);
        row.shared_with.clone_from(&element.shared_with);
        row.is_public = element.is_public;
        row.tags.clone_from(&element.tags);
        row.auto_update = element.auto_update;
        row.last_updated = element.last_updated;
        Ok(Some(row.clone()))
    }

    async fn replace_shared_content(
        &self,
        id: Uuid,
        elements: &[Stroke],
        element_ids: &[i64],
        now: i64,
    ) -> Result<Option<SharedElement>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(row) = inner.shared.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        row.elements = elements.to_vec();
        row.element_ids = element_ids.to_vec();
        row.last_updated = now;
        Ok(Some(row.clone()))
    }

    async fn delete_shared_element(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.shared.len();
        inner.shared.retain(|e| e.id != id);
        Ok(inner.shared.len() != before)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
