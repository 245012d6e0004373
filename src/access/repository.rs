use std::collections::HashSet;

use async_trait::async_trait;

use super::types::{CreateGrant, CreateGroup, Group, GroupGrant};
use crate::AccessError;

/// A projected join row for access-map building: one direct grant together
/// with the (active) group it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantRow {
    pub group_id: i64,
    pub group_name: String,
    pub access: String,
}

/// Group catalog access.
///
/// Group administration beyond this is out of scope; these are the reads
/// the resolver needs plus the minimal writes hosts and test suites use to
/// provision groups.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, data: CreateGroup) -> Result<Group, AccessError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Group>, AccessError>;
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Group>, AccessError>;
    /// First match by id order wins when names collide historically.
    async fn find_by_name(&self, name: &str) -> Result<Option<Group>, AccessError>;
    async fn set_active(&self, id: i64, active: bool) -> Result<Group, AccessError>;
    async fn delete(&self, id: i64) -> Result<(), AccessError>;
}

/// Direct grant storage.
///
/// Every read is implicitly restricted to active groups: a grant on an
/// inactive group behaves as if it does not exist. `levels` parameters are
/// always normalized lists (non-empty, containing "full").
#[async_trait]
pub trait GroupGrantRepository: Send + Sync {
    /// Whether the owner holds any of `levels` on the (active) group.
    async fn has_grant(
        &self,
        owner_id: i64,
        group_id: i64,
        levels: &[String],
    ) -> Result<bool, AccessError>;

    /// Distinct ids of active groups the owner holds any of `levels` on.
    async fn group_ids_with_access(
        &self,
        owner_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError>;

    /// Distinct ids of owners holding any of `levels` on the (active) group.
    async fn owner_ids_with_access(
        &self,
        group_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError>;

    /// All of the owner's grants on active groups, joined with the group
    /// name, for access-map construction.
    async fn access_rows_for_owner(&self, owner_id: i64) -> Result<Vec<GrantRow>, AccessError>;

    /// Atomically replaces the owner's entire grant set.
    ///
    /// Destroy-all then bulk-insert inside one storage transaction: a
    /// failed insert (e.g. a grant referencing a nonexistent group) must
    /// roll the destroy back, leaving the prior set intact. Concurrent
    /// readers observe either the full old set or the full new set.
    async fn replace_for_owner(
        &self,
        owner_id: i64,
        grants: &[CreateGrant],
    ) -> Result<Vec<GroupGrant>, AccessError>;

    /// Deletes all grants for the owner. Returns the number removed.
    async fn delete_for_owner(&self, owner_id: i64) -> Result<u64, AccessError>;
}

/// Role-derived access, consumed as an optional capability.
///
/// Attach a bridge to the resolver when the owner type supports roles;
/// leave it off and every indirect path degrades silently to "no access".
/// The role subsystem's own administration and resolution rules stay on
/// the other side of this trait.
#[async_trait]
pub trait RoleBridge: Send + Sync {
    /// Role ids held by the owner.
    async fn role_ids(&self, owner_id: i64) -> Result<HashSet<i64>, AccessError>;

    /// Whether any of the owner's roles grants one of `levels` on the
    /// (active) group.
    async fn has_role_access(
        &self,
        owner_id: i64,
        group_id: i64,
        levels: &[String],
    ) -> Result<bool, AccessError>;

    /// Distinct ids of active groups reachable through the owner's roles
    /// at any of `levels`.
    async fn group_ids_via_roles(
        &self,
        owner_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError>;

    /// Distinct ids of owners reaching the (active) group through a role
    /// at any of `levels`.
    async fn owner_ids_via_roles(
        &self,
        group_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError>;
}

/// Per-owner cache invalidation, called after every committed write.
///
/// Best-effort: no return value, failures are the implementation's problem.
pub trait OwnerCache: Send + Sync {
    fn invalidate(&self, owner_id: i64);
}

/// Default cache that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOwnerCache;

impl OwnerCache for NoopOwnerCache {
    fn invalidate(&self, _owner_id: i64) {}
}

/// Owner record lookup, supplied by the host for
/// [`owners_with_access`](super::GroupAccessResolver::owners_with_access).
///
/// The owner entity is host-defined; this crate only ever sees its id.
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    type Owner: Send;

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Self::Owner>, AccessError>;
}
