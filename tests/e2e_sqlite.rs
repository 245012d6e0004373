//! End-to-end tests for the `SQLite` repositories.
//!
//! These tests use an in-memory `SQLite` database, one pool per test.
//! Run with: `cargo test --features "sqlx_sqlite roles" --test e2e_sqlite`

#![cfg(feature = "sqlx_sqlite")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, HashSet};

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use cordon::sqlite::{migrations, SqliteGroupGrantRepository, SqliteGroupRepository};
use cordon::{
    AccessError, AccessSpec, CreateGroup, Group, GroupAccessResolver, GroupRepository,
};

async fn setup_db() -> SqlitePool {
    // Every connection to sqlite::memory: is its own database, so the
    // pool is capped at one connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory SQLite database");

    migrations::run(&pool).await.expect("Failed to run migrations");

    pool
}

fn resolver(
    pool: &SqlitePool,
) -> GroupAccessResolver<SqliteGroupRepository, SqliteGroupGrantRepository> {
    GroupAccessResolver::new(
        SqliteGroupRepository::new(pool.clone()),
        SqliteGroupGrantRepository::new(pool.clone()),
    )
}

async fn create_group(pool: &SqlitePool, name: &str, active: bool) -> Group {
    SqliteGroupRepository::new(pool.clone())
        .create(CreateGroup {
            name: name.to_owned(),
            active,
        })
        .await
        .unwrap()
}

fn id_map(entries: &[(i64, &[&str])]) -> HashMap<i64, AccessSpec> {
    entries
        .iter()
        .map(|(id, levels)| (*id, AccessSpec::from(*levels)))
        .collect()
}

#[tokio::test]
async fn test_group_repository_crud() {
    let pool = setup_db().await;
    let repo = SqliteGroupRepository::new(pool);

    let group = repo
        .create(CreateGroup {
            name: "ops".to_owned(),
            active: true,
        })
        .await
        .expect("Failed to create group");
    assert!(group.id > 0);
    assert_eq!(group.name, "ops");
    assert!(group.active);

    let found = repo.find_by_id(group.id).await.unwrap().expect("Group not found");
    assert_eq!(found.name, "ops");

    let found = repo.find_by_name("ops").await.unwrap().expect("Group not found");
    assert_eq!(found.id, group.id);

    let deactivated = repo.set_active(group.id, false).await.unwrap();
    assert!(!deactivated.active);

    repo.delete(group.id).await.unwrap();
    assert!(repo.find_by_id(group.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_active_missing_group_is_not_found() {
    let pool = setup_db().await;
    let repo = SqliteGroupRepository::new(pool);

    let err = repo.set_active(12345, false).await.unwrap_err();
    assert_eq!(err, AccessError::NotFound);
}

#[tokio::test]
async fn test_set_and_resolve_access() {
    let pool = setup_db().await;
    let active = create_group(&pool, "alpha", true).await;
    let inactive = create_group(&pool, "beta", false).await;
    let resolver = resolver(&pool);

    resolver
        .set_access_map_by_id(
            7,
            &id_map(&[(active.id, &["read", "write"]), (inactive.id, &["read"])]),
        )
        .await
        .unwrap();

    assert!(resolver.has_access(7, active.id, "read").await.unwrap());
    assert!(resolver.has_access(7, active.id, "full").await.unwrap());
    // grants on inactive groups never surface
    assert!(!resolver.has_access(7, inactive.id, "read").await.unwrap());

    let ids = resolver.accessible_group_ids(7, "read").await.unwrap();
    assert_eq!(ids, HashSet::from([active.id]));

    let map = resolver.access_map_by_id(7).await.unwrap();
    let levels: HashSet<String> = map.get(&active.id).cloned().unwrap_or_default().into_iter().collect();
    assert_eq!(
        levels,
        HashSet::from(["read".to_owned(), "write".to_owned(), "full".to_owned()])
    );
    assert!(!map.contains_key(&inactive.id));
}

#[tokio::test]
async fn test_replace_rolls_back_on_unknown_group() {
    let pool = setup_db().await;
    let group = create_group(&pool, "alpha", true).await;
    let resolver = resolver(&pool);

    resolver
        .set_access_map_by_id(7, &id_map(&[(group.id, &["read"])]))
        .await
        .unwrap();

    let err = resolver
        .set_access_map_by_id(7, &id_map(&[(group.id, &["write"]), (999, &["read"])]))
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::DatabaseError(_)));

    // the delete inside the failed transaction was rolled back
    let map = resolver.access_map_by_id(7).await.unwrap();
    let levels: HashSet<String> = map.get(&group.id).cloned().unwrap_or_default().into_iter().collect();
    assert_eq!(levels, HashSet::from(["read".to_owned(), "full".to_owned()]));
}

#[tokio::test]
async fn test_set_access_map_by_name() {
    let pool = setup_db().await;
    create_group(&pool, "alpha", true).await;
    let resolver = resolver(&pool);

    let map: HashMap<String, AccessSpec> =
        HashMap::from([("alpha".to_owned(), vec!["read"].into())]);
    resolver.set_access_map_by_name(7, &map).await.unwrap();

    let by_name = resolver.access_map_by_name(7).await.unwrap();
    let levels: HashSet<String> = by_name.get("alpha").cloned().unwrap_or_default().into_iter().collect();
    assert_eq!(levels, HashSet::from(["read".to_owned(), "full".to_owned()]));
}

#[tokio::test]
async fn test_unknown_name_rejected_before_store_mutation() {
    let pool = setup_db().await;
    let group = create_group(&pool, "alpha", true).await;
    let resolver = resolver(&pool);

    resolver
        .set_access_map_by_id(7, &id_map(&[(group.id, &["read"])]))
        .await
        .unwrap();

    let map: HashMap<String, AccessSpec> =
        HashMap::from([("no-such-group".to_owned(), vec!["read"].into())]);
    let err = resolver.set_access_map_by_name(7, &map).await.unwrap_err();
    assert_eq!(err, AccessError::UnknownGroup("no-such-group".to_owned()));

    let map = resolver.access_map_by_id(7).await.unwrap();
    assert!(map.contains_key(&group.id));
}

#[tokio::test]
async fn test_owner_ids_and_purge() {
    let pool = setup_db().await;
    let group = create_group(&pool, "alpha", true).await;
    let resolver = resolver(&pool);

    resolver
        .set_access_map_by_id(1, &id_map(&[(group.id, &["read"])]))
        .await
        .unwrap();
    resolver
        .set_access_map_by_id(2, &id_map(&[(group.id, &["write"])]))
        .await
        .unwrap();

    let ids = resolver.owner_ids_with_access(group.id, "full").await.unwrap();
    assert_eq!(ids, HashSet::from([1, 2]));

    let removed = resolver.purge_owner(1).await.unwrap();
    assert_eq!(removed, 2); // read + implied full

    let ids = resolver.owner_ids_with_access(group.id, "full").await.unwrap();
    assert_eq!(ids, HashSet::from([2]));
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let pool = setup_db().await;
    // a second run sees every migration already applied
    migrations::run(&pool).await.expect("re-run failed");

    create_group(&pool, "alpha", true).await;
}

#[cfg(feature = "roles")]
mod roles {
    use std::sync::Arc;

    use cordon::sqlite::SqliteRoleBridge;
    use cordon::RoleBridge;

    use super::*;

    async fn seed_role(pool: &SqlitePool, owner_id: i64, role_id: i64, group_id: i64, access: &str) {
        sqlx::query("INSERT OR IGNORE INTO owner_roles (owner_id, role_id) VALUES (?, ?)")
            .bind(owner_id)
            .bind(role_id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO role_group_grants (role_id, group_id, access) VALUES (?, ?, ?)")
            .bind(role_id)
            .bind(group_id)
            .bind(access)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_role_derived_access() {
        let pool = setup_db().await;
        let group = create_group(&pool, "gamma", true).await;
        seed_role(&pool, 11, 5, group.id, "read").await;

        let resolver = GroupAccessResolver::new(
            SqliteGroupRepository::new(pool.clone()),
            SqliteGroupGrantRepository::new(pool.clone()),
        )
        .with_role_bridge(Arc::new(SqliteRoleBridge::new(pool.clone())));

        assert!(resolver.has_access(11, group.id, "read").await.unwrap());
        assert!(!resolver.has_access(12, group.id, "read").await.unwrap());

        let ids = resolver.accessible_group_ids(11, "read").await.unwrap();
        assert_eq!(ids, HashSet::from([group.id]));

        let owners = resolver.owner_ids_with_access(group.id, "read").await.unwrap();
        assert_eq!(owners, HashSet::from([11]));
    }

    #[tokio::test]
    async fn test_role_access_ignores_inactive_groups() {
        let pool = setup_db().await;
        let group = create_group(&pool, "gamma", false).await;
        seed_role(&pool, 11, 5, group.id, "read").await;

        let bridge = SqliteRoleBridge::new(pool.clone());
        let levels = vec!["read".to_owned(), "full".to_owned()];
        assert!(!bridge.has_role_access(11, group.id, &levels).await.unwrap());
        assert!(bridge.group_ids_via_roles(11, &levels).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_role_ids() {
        let pool = setup_db().await;
        let group = create_group(&pool, "gamma", true).await;
        seed_role(&pool, 11, 5, group.id, "read").await;
        seed_role(&pool, 11, 6, group.id, "write").await;

        let bridge = SqliteRoleBridge::new(pool.clone());
        let roles = bridge.role_ids(11).await.unwrap();
        assert_eq!(roles, HashSet::from([5, 6]));
    }
}
