//! Feature-gated database migrations for `SQLite`.
//!
//! Migrations are embedded at compile time and run programmatically,
//! tracked in the `_cordon_migrations` table. Only migrations for enabled
//! features are compiled and executed.
//!
//! # Example
//!
//! ```rust,ignore
//! use cordon::sqlite::migrations;
//! use sqlx::SqlitePool;
//!
//! async fn setup_database(pool: &SqlitePool) -> Result<(), sqlx::Error> {
//!     migrations::run(pool).await?;
//!     Ok(())
//! }
//! ```

use sqlx::{Executor, SqlitePool};

/// Core migrations - always required.
const CORE_MIGRATIONS: &[(&str, &str)] = &[
    (
        "20250315000001_create_groups_table",
        include_str!("../../migrations_sqlite/core/20250315000001_create_groups_table.sql"),
    ),
    (
        "20250315000002_create_group_grants_table",
        include_str!("../../migrations_sqlite/core/20250315000002_create_group_grants_table.sql"),
    ),
];

/// Role bridge migrations.
#[cfg(feature = "roles")]
const ROLES_MIGRATIONS: &[(&str, &str)] = &[
    (
        "20250315000003_create_owner_roles_table",
        include_str!("../../migrations_sqlite/roles/20250315000003_create_owner_roles_table.sql"),
    ),
    (
        "20250315000004_create_role_group_grants_table",
        include_str!(
            "../../migrations_sqlite/roles/20250315000004_create_role_group_grants_table.sql"
        ),
    ),
];

/// Runs all database migrations for enabled features.
///
/// Migrations are executed in order and tracked in the `_cordon_migrations`
/// table.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Create migrations tracking table
    pool.execute(
        r"
        CREATE TABLE IF NOT EXISTS _cordon_migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        ",
    )
    .await?;

    run_migrations(pool, CORE_MIGRATIONS).await?;

    #[cfg(feature = "roles")]
    run_migrations(pool, ROLES_MIGRATIONS).await?;

    Ok(())
}

/// Runs a set of migrations against the database.
///
/// # Limitations
///
/// SQL statements are split by semicolons (`;`). This means migrations
/// containing semicolons within string literals will not work correctly.
/// The bundled migrations are designed to avoid this issue.
async fn run_migrations(pool: &SqlitePool, migrations: &[(&str, &str)]) -> Result<(), sqlx::Error> {
    for (name, sql) in migrations {
        // Check if already applied
        let applied: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _cordon_migrations WHERE name = ?)")
                .bind(*name)
                .fetch_one(pool)
                .await?;

        if !applied {
            // SQLite doesn't support multiple statements in one execute,
            // so we split by semicolons and run each statement.
            for statement in sql.split(';') {
                let trimmed = statement.trim();
                if !trimmed.is_empty() {
                    pool.execute(trimmed).await?;
                }
            }

            // Record migration
            sqlx::query("INSERT INTO _cordon_migrations (name) VALUES (?)")
                .bind(*name)
                .execute(pool)
                .await?;
        }
    }
    Ok(())
}
