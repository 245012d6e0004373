use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;

use super::level::{normalize_access, AccessSpec};
use super::repository::{
    GroupGrantRepository, GroupRepository, NoopOwnerCache, OwnerCache, OwnerDirectory, RoleBridge,
};
use super::staged::{PendingGroup, StagedGrants};
use super::types::{Group, GroupGrant, GroupRef};
use crate::events::{dispatch, AccessEvent};
use crate::AccessError;

/// Resolves group access for owner entities.
///
/// Combines direct grants with optional role-derived access: attach a
/// [`RoleBridge`] when the owner type supports roles, and every read
/// operation unions the two sources. Without a bridge, indirect access
/// silently resolves to nothing.
///
/// Writes go through the staged two-phase API: stage an access map into a
/// [`StagedGrants`] buffer, then [`commit`](Self::commit) replaces the
/// owner's entire persisted grant set atomically. The `set_access_map_*`
/// methods do both in one call for owners that already have an id.
pub struct GroupAccessResolver<G, S>
where
    G: GroupRepository,
    S: GroupGrantRepository,
{
    groups: G,
    grants: S,
    roles: Option<Arc<dyn RoleBridge>>,
    cache: Arc<dyn OwnerCache>,
}

impl<G, S> GroupAccessResolver<G, S>
where
    G: GroupRepository,
    S: GroupGrantRepository,
{
    /// Creates a resolver without role support or caching.
    pub fn new(groups: G, grants: S) -> Self {
        Self {
            groups,
            grants,
            roles: None,
            cache: Arc::new(NoopOwnerCache),
        }
    }

    /// Attaches role-derived access. The capability is resolved here,
    /// once, not probed per call.
    #[must_use]
    pub fn with_role_bridge(mut self, bridge: Arc<dyn RoleBridge>) -> Self {
        self.roles = Some(bridge);
        self
    }

    /// Attaches a cache to invalidate per owner after committed writes.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn OwnerCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Checks whether the owner holds one of the requested access levels
    /// on the group, directly or through a role.
    ///
    /// The direct grant check runs first and short-circuits: the role
    /// bridge is never consulted when a direct grant already matches.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` - A direct or role-derived grant matches an active group
    /// - `Ok(false)` - No match, or the group is inactive
    /// - `Err(AccessError::InvalidAccess)` - Malformed access specifier
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "has_access", skip_all, err)
    )]
    pub async fn has_access(
        &self,
        owner_id: i64,
        group: impl Into<GroupRef>,
        access: impl Into<AccessSpec>,
    ) -> Result<bool, AccessError> {
        let levels = normalize_access(&access.into())?;
        let group_id = group.into().id();

        if self.grants.has_grant(owner_id, group_id, &levels).await? {
            return Ok(true);
        }

        match &self.roles {
            Some(bridge) => bridge.has_role_access(owner_id, group_id, &levels).await,
            None => Ok(false),
        }
    }

    /// Ids of all active groups the owner can access at one of the
    /// requested levels: the union of direct grants and role-derived
    /// access, de-duplicated.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "accessible_group_ids", skip_all, err)
    )]
    pub async fn accessible_group_ids(
        &self,
        owner_id: i64,
        access: impl Into<AccessSpec>,
    ) -> Result<HashSet<i64>, AccessError> {
        let levels = normalize_access(&access.into())?;

        let mut ids = self.grants.group_ids_with_access(owner_id, &levels).await?;
        if let Some(bridge) = &self.roles {
            ids.extend(bridge.group_ids_via_roles(owner_id, &levels).await?);
        }

        Ok(ids)
    }

    /// Group records for [`accessible_group_ids`](Self::accessible_group_ids),
    /// ordered by id.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "accessible_groups", skip_all, err)
    )]
    pub async fn accessible_groups(
        &self,
        owner_id: i64,
        access: impl Into<AccessSpec>,
    ) -> Result<Vec<Group>, AccessError> {
        let mut ids: Vec<i64> = self
            .accessible_group_ids(owner_id, access)
            .await?
            .into_iter()
            .collect();
        ids.sort_unstable();

        self.groups.find_by_ids(&ids).await
    }

    /// Ids of all owners that can access the group at one of the requested
    /// levels, directly or through a role.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "owner_ids_with_access", skip_all, err)
    )]
    pub async fn owner_ids_with_access(
        &self,
        group: impl Into<GroupRef>,
        access: impl Into<AccessSpec>,
    ) -> Result<HashSet<i64>, AccessError> {
        let levels = normalize_access(&access.into())?;
        let group_id = group.into().id();

        let mut ids = self.grants.owner_ids_with_access(group_id, &levels).await?;
        if let Some(bridge) = &self.roles {
            ids.extend(bridge.owner_ids_via_roles(group_id, &levels).await?);
        }

        Ok(ids)
    }

    /// Owner records for [`owner_ids_with_access`](Self::owner_ids_with_access),
    /// fetched through the host-supplied directory, ordered by id.
    pub async fn owners_with_access<D>(
        &self,
        directory: &D,
        group: impl Into<GroupRef>,
        access: impl Into<AccessSpec>,
    ) -> Result<Vec<D::Owner>, AccessError>
    where
        D: OwnerDirectory,
    {
        let mut ids: Vec<i64> = self
            .owner_ids_with_access(group, access)
            .await?
            .into_iter()
            .collect();
        ids.sort_unstable();

        directory.find_by_ids(&ids).await
    }

    /// The owner's direct grants as a map of group id to held access
    /// levels.
    ///
    /// Covers direct grants on active groups only - role-derived access is
    /// deliberately excluded from map views, which show the grants an
    /// administrator assigned rather than everything an owner can reach.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "access_map_by_id", skip_all, err)
    )]
    pub async fn access_map_by_id(
        &self,
        owner_id: i64,
    ) -> Result<HashMap<i64, Vec<String>>, AccessError> {
        let rows = self.grants.access_rows_for_owner(owner_id).await?;

        let mut map: HashMap<i64, Vec<String>> = HashMap::new();
        for row in rows {
            map.entry(row.group_id).or_default().push(row.access);
        }

        Ok(map)
    }

    /// Like [`access_map_by_id`](Self::access_map_by_id), keyed by group
    /// name.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "access_map_by_name", skip_all, err)
    )]
    pub async fn access_map_by_name(
        &self,
        owner_id: i64,
    ) -> Result<HashMap<String, Vec<String>>, AccessError> {
        let rows = self.grants.access_rows_for_owner(owner_id).await?;

        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            map.entry(row.group_name).or_default().push(row.access);
        }

        Ok(map)
    }

    /// Buffers an id-keyed access map into `staged` without touching the
    /// store.
    ///
    /// Each value is normalized (so every staged set carries "full");
    /// group ids are not validated here - a nonexistent id fails the later
    /// commit and rolls the whole write back.
    pub fn stage_access_map_by_id(
        &self,
        staged: &mut StagedGrants,
        map: &HashMap<i64, AccessSpec>,
    ) -> Result<(), AccessError> {
        for (group_id, spec) in map {
            for level in normalize_access(spec)? {
                staged.push(PendingGroup::Id(*group_id), level);
            }
        }
        Ok(())
    }

    /// Buffers a name-keyed access map into `staged`, resolving each name
    /// to a group id (first match by id order wins).
    ///
    /// An unresolvable name is buffered as-is and rejects the later commit
    /// with [`AccessError::UnknownGroup`] - staging never fails on it.
    pub async fn stage_access_map_by_name(
        &self,
        staged: &mut StagedGrants,
        map: &HashMap<String, AccessSpec>,
    ) -> Result<(), AccessError> {
        for (name, spec) in map {
            let levels = normalize_access(spec)?;
            let group = match self.groups.find_by_name(name).await? {
                Some(group) => PendingGroup::Id(group.id),
                None => PendingGroup::Unresolved(name.clone()),
            };
            for level in levels {
                staged.push(group.clone(), level);
            }
        }
        Ok(())
    }

    /// Atomically replaces the owner's entire direct grant set with the
    /// staged buffer.
    ///
    /// Destroy-all plus bulk-insert run in one storage transaction; on any
    /// failure the prior grant set is left completely intact and the
    /// buffer is kept. On success the buffer is cleared, the owner's cache
    /// entry is invalidated, and a `GrantsReplaced` event is dispatched.
    ///
    /// # Returns
    ///
    /// - `Ok(grants)` - The newly created grant rows
    /// - `Err(AccessError::UnknownGroup)` - A staged name never resolved;
    ///   nothing was written
    /// - `Err(AccessError::DatabaseError)` - Store failure; transaction
    ///   rolled back
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "commit_grants", skip_all, err))]
    pub async fn commit(
        &self,
        owner_id: i64,
        staged: &mut StagedGrants,
    ) -> Result<Vec<GroupGrant>, AccessError> {
        let grants = staged
            .resolve()
            .map_err(AccessError::UnknownGroup)?;

        let created = self.grants.replace_for_owner(owner_id, &grants).await?;
        staged.clear();

        self.cache.invalidate(owner_id);
        dispatch(AccessEvent::GrantsReplaced {
            owner_id,
            grant_count: created.len(),
            at: Utc::now(),
        })
        .await;

        Ok(created)
    }

    /// Stages and commits an id-keyed access map in one call.
    pub async fn set_access_map_by_id(
        &self,
        owner_id: i64,
        map: &HashMap<i64, AccessSpec>,
    ) -> Result<Vec<GroupGrant>, AccessError> {
        let mut staged = StagedGrants::new();
        self.stage_access_map_by_id(&mut staged, map)?;
        self.commit(owner_id, &mut staged).await
    }

    /// Stages and commits a name-keyed access map in one call.
    pub async fn set_access_map_by_name(
        &self,
        owner_id: i64,
        map: &HashMap<String, AccessSpec>,
    ) -> Result<Vec<GroupGrant>, AccessError> {
        let mut staged = StagedGrants::new();
        self.stage_access_map_by_name(&mut staged, map).await?;
        self.commit(owner_id, &mut staged).await
    }

    /// Removes every direct grant for the owner.
    ///
    /// The before-deletion entry point: hosts call this from the owner's
    /// delete path. Invalidates the cache entry and dispatches a
    /// `GrantsPurged` event.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "purge_owner", skip_all, err))]
    pub async fn purge_owner(&self, owner_id: i64) -> Result<u64, AccessError> {
        let removed = self.grants.delete_for_owner(owner_id).await?;

        self.cache.invalidate(owner_id);
        dispatch(AccessEvent::GrantsPurged {
            owner_id,
            at: Utc::now(),
        })
        .await;

        Ok(removed)
    }
}
