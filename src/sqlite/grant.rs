//! `SQLite` implementation of [`GroupGrantRepository`].

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::placeholders;
use crate::access::{CreateGrant, GrantRow, GroupGrant, GroupGrantRepository};
use crate::AccessError;

/// `SQLite`-backed direct grant store.
///
/// All reads join `groups` on the active flag, so grants on inactive
/// groups never surface. [`replace_for_owner`](GroupGrantRepository::replace_for_owner)
/// runs destroy-all plus bulk-insert in one transaction.
#[derive(Clone)]
pub struct SqliteGroupGrantRepository {
    pool: SqlitePool,
}

impl SqliteGroupGrantRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct GrantRecord {
    id: i64,
    owner_id: i64,
    group_id: i64,
    access: String,
    created_at: DateTime<Utc>,
}

impl From<GrantRecord> for GroupGrant {
    fn from(row: GrantRecord) -> Self {
        GroupGrant {
            id: row.id,
            owner_id: row.owner_id,
            group_id: row.group_id,
            access: row.access,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AccessRowRecord {
    group_id: i64,
    group_name: String,
    access: String,
}

#[async_trait]
impl GroupGrantRepository for SqliteGroupGrantRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn has_grant(
        &self,
        owner_id: i64,
        group_id: i64,
        levels: &[String],
    ) -> Result<bool, AccessError> {
        let sql = format!(
            r"
            SELECT EXISTS(
                SELECT 1 FROM group_grants gg
                INNER JOIN groups g ON g.id = gg.group_id
                WHERE gg.owner_id = ? AND gg.group_id = ? AND g.active = 1
                  AND gg.access IN ({})
            )
            ",
            placeholders(levels.len()),
        );
        let mut query = sqlx::query_scalar::<_, bool>(&sql).bind(owner_id).bind(group_id);
        for level in levels {
            query = query.bind(level);
        }

        query.fetch_one(&self.pool).await.map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"has_grant\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn group_ids_with_access(
        &self,
        owner_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError> {
        let sql = format!(
            r"
            SELECT DISTINCT gg.group_id FROM group_grants gg
            INNER JOIN groups g ON g.id = gg.group_id
            WHERE gg.owner_id = ? AND g.active = 1 AND gg.access IN ({})
            ",
            placeholders(levels.len()),
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(owner_id);
        for level in levels {
            query = query.bind(level);
        }

        let ids = query.fetch_all(&self.pool).await.map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"group_ids_with_access\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        Ok(ids.into_iter().collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn owner_ids_with_access(
        &self,
        group_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError> {
        let sql = format!(
            r"
            SELECT DISTINCT gg.owner_id FROM group_grants gg
            INNER JOIN groups g ON g.id = gg.group_id
            WHERE gg.group_id = ? AND g.active = 1 AND gg.access IN ({})
            ",
            placeholders(levels.len()),
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(group_id);
        for level in levels {
            query = query.bind(level);
        }

        let ids = query.fetch_all(&self.pool).await.map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"owner_ids_with_access\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        Ok(ids.into_iter().collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn access_rows_for_owner(&self, owner_id: i64) -> Result<Vec<GrantRow>, AccessError> {
        let rows: Vec<AccessRowRecord> = sqlx::query_as(
            r"
            SELECT gg.group_id, g.name AS group_name, gg.access FROM group_grants gg
            INNER JOIN groups g ON g.id = gg.group_id
            WHERE gg.owner_id = ? AND g.active = 1
            ORDER BY gg.group_id ASC, gg.access ASC
            ",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"access_rows_for_owner\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        Ok(rows
            .into_iter()
            .map(|row| GrantRow {
                group_id: row.group_id,
                group_name: row.group_name,
                access: row.access,
            })
            .collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, grants), err))]
    async fn replace_for_owner(
        &self,
        owner_id: i64,
        grants: &[CreateGrant],
    ) -> Result<Vec<GroupGrant>, AccessError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"replace_for_owner\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        sqlx::query("DELETE FROM group_grants WHERE owner_id = ?")
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                log::error!(target: "cordon", "msg=\"database error\", operation=\"replace_for_owner\", error=\"{e}\"");
                AccessError::DatabaseError(e.to_string())
            })?;

        // Verify every referenced group exists inside the transaction, so a
        // bad id rolls the delete back whether or not the host enabled
        // SQLite foreign-key enforcement on its pool.
        let group_ids: HashSet<i64> = grants.iter().map(|g| g.group_id).collect();
        for group_id in &group_ids {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM groups WHERE id = ?)")
                .bind(group_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    log::error!(target: "cordon", "msg=\"database error\", operation=\"replace_for_owner\", error=\"{e}\"");
                    AccessError::DatabaseError(e.to_string())
                })?;
            if !exists {
                // tx dropped here, rolling the delete back
                return Err(AccessError::DatabaseError(format!(
                    "FOREIGN KEY constraint failed: no group with id {group_id}"
                )));
            }
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(grants.len());
        for grant in grants {
            let row: GrantRecord = sqlx::query_as(
                r"
                INSERT INTO group_grants (owner_id, group_id, access, created_at)
                VALUES (?, ?, ?, ?)
                RETURNING id, owner_id, group_id, access, created_at
                ",
            )
            .bind(owner_id)
            .bind(grant.group_id)
            .bind(&grant.access)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                log::error!(target: "cordon", "msg=\"database error\", operation=\"replace_for_owner\", error=\"{e}\"");
                AccessError::DatabaseError(e.to_string())
            })?;
            created.push(row.into());
        }

        tx.commit().await.map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"replace_for_owner\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        Ok(created)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn delete_for_owner(&self, owner_id: i64) -> Result<u64, AccessError> {
        let result = sqlx::query("DELETE FROM group_grants WHERE owner_id = ?")
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                log::error!(target: "cordon", "msg=\"database error\", operation=\"delete_for_owner\", error=\"{e}\"");
                AccessError::DatabaseError(e.to_string())
            })?;

        Ok(result.rows_affected())
    }
}
