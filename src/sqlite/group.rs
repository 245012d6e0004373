//! `SQLite` implementation of [`GroupRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::placeholders;
use crate::access::{CreateGroup, Group, GroupRepository};
use crate::AccessError;

/// `SQLite`-backed group catalog.
#[derive(Clone)]
pub struct SqliteGroupRepository {
    pool: SqlitePool,
}

impl SqliteGroupRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct GroupRecord {
    id: i64,
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GroupRecord> for Group {
    fn from(row: GroupRecord) -> Self {
        Group {
            id: row.id,
            name: row.name,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl GroupRepository for SqliteGroupRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create(&self, data: CreateGroup) -> Result<Group, AccessError> {
        let row: GroupRecord = sqlx::query_as(
            r"
            INSERT INTO groups (name, active)
            VALUES (?, ?)
            RETURNING id, name, active, created_at, updated_at
            ",
        )
        .bind(&data.name)
        .bind(data.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"create_group\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Group>, AccessError> {
        let row: Option<GroupRecord> = sqlx::query_as(
            "SELECT id, name, active, created_at, updated_at FROM groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"find_group_by_id\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Group>, AccessError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, name, active, created_at, updated_at FROM groups WHERE id IN ({}) ORDER BY id ASC",
            placeholders(ids.len()),
        );
        let mut query = sqlx::query_as::<_, GroupRecord>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"find_groups_by_ids\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_name(&self, name: &str) -> Result<Option<Group>, AccessError> {
        let row: Option<GroupRecord> = sqlx::query_as(
            "SELECT id, name, active, created_at, updated_at FROM groups WHERE name = ? ORDER BY id ASC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"find_group_by_name\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn set_active(&self, id: i64, active: bool) -> Result<Group, AccessError> {
        let now = Utc::now();

        let row: GroupRecord = sqlx::query_as(
            r"
            UPDATE groups SET active = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, name, active, created_at, updated_at
            ",
        )
        .bind(active)
        .bind(now)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AccessError::NotFound,
            _ => {
                log::error!(target: "cordon", "msg=\"database error\", operation=\"set_group_active\", error=\"{e}\"");
                AccessError::DatabaseError(e.to_string())
            }
        })?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn delete(&self, id: i64) -> Result<(), AccessError> {
        sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                log::error!(target: "cordon", "msg=\"database error\", operation=\"delete_group\", error=\"{e}\"");
                AccessError::DatabaseError(e.to_string())
            })?;

        Ok(())
    }
}
