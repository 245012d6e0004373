//! `SQLite` implementation of [`RoleBridge`].
//!
//! A reference bridge over two host-maintained tables: `owner_roles`
//! (which roles an owner holds) and `role_group_grants` (which access
//! levels a role has on a group). Role administration stays with the host;
//! this only implements the read interface the resolver consumes.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::placeholders;
use crate::access::RoleBridge;
use crate::AccessError;

/// `SQLite`-backed role bridge.
#[derive(Clone)]
pub struct SqliteRoleBridge {
    pool: SqlitePool,
}

impl SqliteRoleBridge {
    /// Create a new bridge with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleBridge for SqliteRoleBridge {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn role_ids(&self, owner_id: i64) -> Result<HashSet<i64>, AccessError> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT role_id FROM owner_roles WHERE owner_id = ?")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    log::error!(target: "cordon", "msg=\"database error\", operation=\"role_ids\", error=\"{e}\"");
                    AccessError::DatabaseError(e.to_string())
                })?;

        Ok(ids.into_iter().collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn has_role_access(
        &self,
        owner_id: i64,
        group_id: i64,
        levels: &[String],
    ) -> Result<bool, AccessError> {
        let sql = format!(
            r"
            SELECT EXISTS(
                SELECT 1 FROM owner_roles r
                INNER JOIN role_group_grants rg ON rg.role_id = r.role_id
                INNER JOIN groups g ON g.id = rg.group_id
                WHERE r.owner_id = ? AND rg.group_id = ? AND g.active = 1
                  AND rg.access IN ({})
            )
            ",
            placeholders(levels.len()),
        );
        let mut query = sqlx::query_scalar::<_, bool>(&sql).bind(owner_id).bind(group_id);
        for level in levels {
            query = query.bind(level);
        }

        query.fetch_one(&self.pool).await.map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"has_role_access\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn group_ids_via_roles(
        &self,
        owner_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError> {
        let sql = format!(
            r"
            SELECT DISTINCT rg.group_id FROM owner_roles r
            INNER JOIN role_group_grants rg ON rg.role_id = r.role_id
            INNER JOIN groups g ON g.id = rg.group_id
            WHERE r.owner_id = ? AND g.active = 1 AND rg.access IN ({})
            ",
            placeholders(levels.len()),
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(owner_id);
        for level in levels {
            query = query.bind(level);
        }

        let ids = query.fetch_all(&self.pool).await.map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"group_ids_via_roles\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        Ok(ids.into_iter().collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn owner_ids_via_roles(
        &self,
        group_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError> {
        let sql = format!(
            r"
            SELECT DISTINCT r.owner_id FROM owner_roles r
            INNER JOIN role_group_grants rg ON rg.role_id = r.role_id
            INNER JOIN groups g ON g.id = rg.group_id
            WHERE rg.group_id = ? AND g.active = 1 AND rg.access IN ({})
            ",
            placeholders(levels.len()),
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(group_id);
        for level in levels {
            query = query.bind(level);
        }

        let ids = query.fetch_all(&self.pool).await.map_err(|e| {
            log::error!(target: "cordon", "msg=\"database error\", operation=\"owner_ids_via_roles\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        })?;

        Ok(ids.into_iter().collect())
    }
}
