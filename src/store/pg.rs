//! PostgreSQL [`DocumentStore`].
//!
//! Rows are read with tuple `query_as` and converted in one place per table.
//! Stroke arrays live in `JSONB` columns and are decoded with serde; a row
//! whose JSON no longer matches the stroke model surfaces as
//! [`StoreError::Corrupt`] instead of a panic. Collaborator, star, and share
//! lists are native `UUID[]` columns updated in single statements, so two
//! concurrent stars never lose each other.

use async_trait::async_trait;
use frames::Stroke;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{DocumentStore, StoreError};
use crate::model::{Content, ShareFilter, SharedElement, UserRef, Whiteboard};

const WHITEBOARD_COLUMNS: &str =
    "id, name, owner_id, collaborators, elements, version, is_public, starred_by, last_modified, created_at";

const SHARED_COLUMNS: &str = "id, name, description, elements, element_ids, source_whiteboard, shared_by, \
     shared_with, is_public, tags, auto_update, last_updated, created_at";

type WhiteboardRow = (Uuid, String, Uuid, Vec<Uuid>, serde_json::Value, i64, bool, Vec<Uuid>, i64, i64);

type SharedRow = (
    Uuid,
    String,
    String,
    serde_json::Value,
    Vec<i64>,
    Uuid,
    Uuid,
    Vec<Uuid>,
    bool,
    Vec<String>,
    bool,
    i64,
    i64,
);

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_whiteboard(&self, sql: &str, id: Uuid, user: Option<Uuid>) -> Result<Option<Whiteboard>, StoreError> {
        let mut query = sqlx::query_as::<_, WhiteboardRow>(sql).bind(id);
        if let Some(user) = user {
            query = query.bind(user);
        }
        query.fetch_optional(&self.pool).await?.map(whiteboard_from_row).transpose()
    }
}

// =============================================================================
// ROW CONVERSION
// =============================================================================

fn strokes_from_json(value: serde_json::Value, what: &str, id: Uuid) -> Result<Vec<Stroke>, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt(format!("{what} {id}: {e}")))
}

fn whiteboard_from_row(row: WhiteboardRow) -> Result<Whiteboard, StoreError> {
    let (id, name, owner, collaborators, elements, version, is_public, starred_by, last_modified, created_at) = row;
    Ok(Whiteboard {
        id,
        name,
        owner,
        collaborators,
        content: Content { elements: strokes_from_json(elements, "whiteboard", id)?, version },
        is_public,
        starred_by,
        last_modified,
        created_at,
    })
}

fn shared_from_row(row: SharedRow) -> Result<SharedElement, StoreError> {
    let (
        id,
        name,
        description,
        elements,
        element_ids,
        source_whiteboard,
        shared_by,
        shared_with,
        is_public,
        tags,
        auto_update,
        last_updated,
        created_at,
    ) = row;
    Ok(SharedElement {
        id,
        name,
        description,
        elements: strokes_from_json(elements, "shared element", id)?,
        element_ids,
        source_whiteboard,
        shared_by,
        shared_with,
        is_public,
        tags,
        auto_update,
        last_updated,
        created_at,
    })
}

fn conflict_or_database(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Conflict(what());
        }
    }
    StoreError::Database(err)
}

// =============================================================================
// STORE
// =============================================================================

#[async_trait]
impl DocumentStore for PgStore {
    async fn resolve_session(&self, token: &str) -> Result<Option<UserRef>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT u.id, u.name, u.email FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, email)| UserRef { id, name, email }))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRef>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, name, email FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, email)| UserRef { id, name, email }))
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRef>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, String, String)>("SELECT id, name, email FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, email)| UserRef { id, name, email })
            .collect())
    }

    async fn insert_whiteboard(&self, wb: &Whiteboard) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO whiteboards (id, name, owner_id, collaborators, elements, version, is_public, starred_by, \
             last_modified, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(wb.id)
        .bind(&wb.name)
        .bind(wb.owner)
        .bind(&wb.collaborators)
        .bind(Json(&wb.content.elements))
        .bind(wb.content.version)
        .bind(wb.is_public)
        .bind(&wb.starred_by)
        .bind(wb.last_modified)
        .bind(wb.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, || format!("whiteboard name {:?} is taken", wb.name)))?;
        Ok(())
    }

    async fn get_whiteboard(&self, id: Uuid) -> Result<Option<Whiteboard>, StoreError> {
        let sql = format!("SELECT {WHITEBOARD_COLUMNS} FROM whiteboards WHERE id = $1");
        self.fetch_whiteboard(&sql, id, None).await
    }

    async fn list_whiteboards_for(&self, user: Uuid) -> Result<Vec<Whiteboard>, StoreError> {
        let sql = format!(
            "SELECT {WHITEBOARD_COLUMNS} FROM whiteboards \
             WHERE owner_id = $1 OR $1 = ANY(collaborators) ORDER BY last_modified DESC"
        );
        let rows = sqlx::query_as::<_, WhiteboardRow>(&sql)
            .bind(user)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(whiteboard_from_row).collect()
    }

    async fn list_starred(&self, user: Uuid) -> Result<Vec<Whiteboard>, StoreError> {
        let sql = format!(
            "SELECT {WHITEBOARD_COLUMNS} FROM whiteboards WHERE $1 = ANY(starred_by) ORDER BY last_modified DESC"
        );
        let rows = sqlx::query_as::<_, WhiteboardRow>(&sql)
            .bind(user)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(whiteboard_from_row).collect()
    }

    async fn save_content(&self, id: Uuid, elements: &[Stroke], now: i64) -> Result<Option<Whiteboard>, StoreError> {
        let sql = format!(
            "UPDATE whiteboards SET elements = $2, version = version + 1, last_modified = $3 \
             WHERE id = $1 RETURNING {WHITEBOARD_COLUMNS}"
        );
        let row = sqlx::query_as::<_, WhiteboardRow>(&sql)
            .bind(id)
            .bind(Json(elements))
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        row.map(whiteboard_from_row).transpose()
    }

    async fn set_starred(&self, id: Uuid, user: Uuid, starred: bool) -> Result<Option<Whiteboard>, StoreError> {
        let sql = format!(
            "UPDATE whiteboards SET starred_by = CASE \
                 WHEN $3::boolean AND NOT ($2::uuid = ANY(starred_by)) THEN array_append(starred_by, $2::uuid) \
                 WHEN $3::boolean THEN starred_by \
                 ELSE array_remove(starred_by, $2::uuid) END \
             WHERE id = $1 RETURNING {WHITEBOARD_COLUMNS}"
        );
        let row = sqlx::query_as::<_, WhiteboardRow>(&sql)
            .bind(id)
            .bind(user)
            .bind(starred)
            .fetch_optional(&self.pool)
            .await?;
        row.map(whiteboard_from_row).transpose()
    }

    async fn add_collaborator(&self, id: Uuid, user: Uuid) -> Result<Option<Whiteboard>, StoreError> {
        let sql = format!(
            "UPDATE whiteboards SET collaborators = CASE \
                 WHEN $2::uuid = ANY(collaborators) THEN collaborators \
                 ELSE array_append(collaborators, $2::uuid) END \
             WHERE id = $1 RETURNING {WHITEBOARD_COLUMNS}"
        );
        self.fetch_whiteboard(&sql, id, Some(user)).await
    }

    async fn remove_collaborator(&self, id: Uuid, user: Uuid) -> Result<Option<Whiteboard>, StoreError> {
        let sql = format!(
            "UPDATE whiteboards SET collaborators = array_remove(collaborators, $2::uuid) \
             WHERE id = $1 RETURNING {WHITEBOARD_COLUMNS}"
        );
        self.fetch_whiteboard(&sql, id, Some(user)).await
    }

    async fn delete_whiteboard(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM whiteboards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_shared_element(&self, el: &SharedElement) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO shared_elements (id, name, description, elements, element_ids, source_whiteboard, \
             shared_by, shared_with, is_public, tags, auto_update, last_updated, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(el.id)
        .bind(&el.name)
        .bind(&el.description)
        .bind(Json(&el.elements))
        .bind(&el.element_ids)
        .bind(el.source_whiteboard)
        .bind(el.shared_by)
        .bind(&el.shared_with)
        .bind(el.is_public)
        .bind(&el.tags)
        .bind(el.auto_update)
        .bind(el.last_updated)
        .bind(el.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, || format!("shared element {} exists", el.id)))?;
        Ok(())
    }

    async fn get_shared_element(&self, id: Uuid) -> Result<Option<SharedElement>, StoreError> {
        let sql = format!("SELECT {SHARED_COLUMNS} FROM shared_elements WHERE id = $1");
        let row = sqlx::query_as::<_, SharedRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(shared_from_row).transpose()
    }

    async fn list_shared_elements(&self, viewer: Uuid, filter: ShareFilter) -> Result<Vec<SharedElement>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {SHARED_COLUMNS} FROM shared_elements WHERE "));
        match filter {
            ShareFilter::Received => {
                builder.push_bind(viewer);
                builder.push(" = ANY(shared_with) OR is_public");
            }
            ShareFilter::Shared => {
                builder.push("shared_by = ");
                builder.push_bind(viewer);
            }
            ShareFilter::Public => {
                builder.push("is_public");
            }
            ShareFilter::Private => {
                builder.push("shared_by = ");
                builder.push_bind(viewer);
                builder.push(" AND NOT is_public");
            }
            ShareFilter::All => {
                builder.push("TRUE");
            }
        }
        builder.push(" ORDER BY created_at DESC");

        let rows = builder
            .build_query_as::<SharedRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(shared_from_row).collect()
    }

    async fn list_by_source(&self, whiteboard_id: Uuid) -> Result<Vec<SharedElement>, StoreError> {
        let sql = format!("SELECT {SHARED_COLUMNS} FROM shared_elements WHERE source_whiteboard = $1");
        let rows = sqlx::query_as::<_, SharedRow>(&sql)
            .bind(whiteboard_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(shared_from_row).collect()
    }

    async fn update_shared_element(&self, el: &SharedElement) -> Result<Option<SharedElement>, StoreError> {
        let sql = format!(
            "UPDATE shared_elements SET name = $2, description = $3, shared_with = $4, is_public = $5, \
             tags = $6, auto_update = $7, last_updated = $8 WHERE id = $1 RETURNING {SHARED_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SharedRow>(&sql)
            .bind(el.id)
            .bind(&el.name)
            .bind(&el.description)
            .bind(&el.shared_with)
            .bind(el.is_public)
            .bind(&el.tags)
            .bind(el.auto_update)
            .bind(el.last_updated)
            .fetch_optional(&self.pool)
            .await?;
        row.map(shared_from_row).transpose()
    }

    async fn replace_shared_content(
        &self,
        id: Uuid,
        elements: &[Stroke],
        element_ids: &[i64],
        now: i64,
    ) -> Result<Option<SharedElement>, StoreError> {
        let sql = format!(
            "UPDATE shared_elements SET elements = $2, element_ids = $3, last_updated = $4 \
             WHERE id = $1 RETURNING {SHARED_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SharedRow>(&sql)
            .bind(id)
            .bind(Json(elements))
            .bind(element_ids)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        row.map(shared_from_row).transpose()
    }

    async fn delete_shared_element(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM shared_elements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "pg_test.rs"]
mod tests;
