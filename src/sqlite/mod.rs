//! `SQLite` database backend implementations.
//!
//! This module provides `SQLite`-backed implementations for the repository
//! traits. Enable the `sqlx_sqlite` feature to use these implementations,
//! and the `roles` feature for the bundled role bridge.

mod grant;
mod group;
pub mod migrations;
#[cfg(feature = "roles")]
mod role_bridge;

pub use grant::SqliteGroupGrantRepository;
pub use group::SqliteGroupRepository;
#[cfg(feature = "roles")]
pub use role_bridge::SqliteRoleBridge;
use sqlx::SqlitePool;

/// Creates the `SQLite` repository instances from a connection pool.
pub fn create_repositories(pool: SqlitePool) -> (SqliteGroupRepository, SqliteGroupGrantRepository) {
    (
        SqliteGroupRepository::new(pool.clone()),
        SqliteGroupGrantRepository::new(pool),
    )
}

/// Builds a `?, ?, …` placeholder list for a dynamic `IN (…)` clause.
///
/// Values are always bound; only the placeholder count is interpolated.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
