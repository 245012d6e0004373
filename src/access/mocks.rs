#![allow(clippy::significant_drop_tightening)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use super::repository::{
    GrantRow, GroupGrantRepository, GroupRepository, OwnerCache, RoleBridge,
};
use super::types::{CreateGrant, CreateGroup, Group, GroupGrant};
use crate::AccessError;

/// In-memory group catalog.
///
/// Clones share state: the catalog map is behind an `Arc`, and the mock
/// grant repository and role bridge join against the same map for their
/// active-group restriction.
#[derive(Clone)]
pub struct MockGroupRepository {
    groups: Arc<RwLock<HashMap<i64, Group>>>,
    next_id: Arc<AtomicI64>,
}

impl MockGroupRepository {
    pub fn new() -> Self {
        Self {
            groups: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    pub(crate) fn catalog(&self) -> Arc<RwLock<HashMap<i64, Group>>> {
        Arc::clone(&self.groups)
    }
}

impl Default for MockGroupRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupRepository for MockGroupRepository {
    async fn create(&self, data: CreateGroup) -> Result<Group, AccessError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let group = Group {
            id,
            name: data.name,
            active: data.active,
            created_at: now,
            updated_at: now,
        };

        let mut groups = self
            .groups
            .write()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        groups.insert(id, group.clone());

        Ok(group)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Group>, AccessError> {
        let groups = self
            .groups
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(groups.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Group>, AccessError> {
        let groups = self
            .groups
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(ids.iter().filter_map(|id| groups.get(id).cloned()).collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Group>, AccessError> {
        let groups = self
            .groups
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        // first match by id order
        Ok(groups
            .values()
            .filter(|g| g.name == name)
            .min_by_key(|g| g.id)
            .cloned())
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<Group, AccessError> {
        let mut groups = self
            .groups
            .write()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;

        let group = groups.get_mut(&id).ok_or(AccessError::NotFound)?;
        group.active = active;
        group.updated_at = Utc::now();

        Ok(group.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), AccessError> {
        let mut groups = self
            .groups
            .write()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        groups.remove(&id);
        Ok(())
    }
}

/// In-memory grant store joining the shared group catalog for the
/// active-group restriction.
pub struct MockGroupGrantRepository {
    groups: Arc<RwLock<HashMap<i64, Group>>>,
    grants: RwLock<Vec<GroupGrant>>,
    next_id: AtomicI64,
}

impl MockGroupGrantRepository {
    /// Creates a grant store sharing `catalog`'s group map.
    pub fn new(catalog: &MockGroupRepository) -> Self {
        Self {
            groups: catalog.catalog(),
            grants: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn active_group_ids(&self) -> Result<HashSet<i64>, AccessError> {
        let groups = self
            .groups
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(groups.values().filter(|g| g.active).map(|g| g.id).collect())
    }
}

#[async_trait]
impl GroupGrantRepository for MockGroupGrantRepository {
    async fn has_grant(
        &self,
        owner_id: i64,
        group_id: i64,
        levels: &[String],
    ) -> Result<bool, AccessError> {
        let active = self.active_group_ids()?;
        let grants = self
            .grants
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(grants.iter().any(|g| {
            g.owner_id == owner_id
                && g.group_id == group_id
                && active.contains(&g.group_id)
                && levels.contains(&g.access)
        }))
    }

    async fn group_ids_with_access(
        &self,
        owner_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError> {
        let active = self.active_group_ids()?;
        let grants = self
            .grants
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(grants
            .iter()
            .filter(|g| {
                g.owner_id == owner_id
                    && active.contains(&g.group_id)
                    && levels.contains(&g.access)
            })
            .map(|g| g.group_id)
            .collect())
    }

    async fn owner_ids_with_access(
        &self,
        group_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError> {
        let active = self.active_group_ids()?;
        let grants = self
            .grants
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(grants
            .iter()
            .filter(|g| {
                g.group_id == group_id
                    && active.contains(&g.group_id)
                    && levels.contains(&g.access)
            })
            .map(|g| g.owner_id)
            .collect())
    }

    async fn access_rows_for_owner(&self, owner_id: i64) -> Result<Vec<GrantRow>, AccessError> {
        let groups = self
            .groups
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        let grants = self
            .grants
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;

        let mut rows: Vec<GrantRow> = grants
            .iter()
            .filter(|g| g.owner_id == owner_id)
            .filter_map(|g| {
                let group = groups.get(&g.group_id)?;
                group.active.then(|| GrantRow {
                    group_id: g.group_id,
                    group_name: group.name.clone(),
                    access: g.access.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| (a.group_id, &a.access).cmp(&(b.group_id, &b.access)));

        Ok(rows)
    }

    async fn replace_for_owner(
        &self,
        owner_id: i64,
        new_grants: &[CreateGrant],
    ) -> Result<Vec<GroupGrant>, AccessError> {
        // validate before mutating, so a bad entry leaves the prior set
        // intact - the mock's stand-in for transactional rollback
        {
            let groups = self
                .groups
                .read()
                .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
            for grant in new_grants {
                if !groups.contains_key(&grant.group_id) {
                    return Err(AccessError::DatabaseError(format!(
                        "FOREIGN KEY constraint failed: no group with id {}",
                        grant.group_id
                    )));
                }
            }
        }

        let mut grants = self
            .grants
            .write()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        grants.retain(|g| g.owner_id != owner_id);

        let now = Utc::now();
        let mut created = Vec::with_capacity(new_grants.len());
        for grant in new_grants {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let record = GroupGrant {
                id,
                owner_id,
                group_id: grant.group_id,
                access: grant.access.clone(),
                created_at: now,
            };
            grants.push(record.clone());
            created.push(record);
        }

        Ok(created)
    }

    async fn delete_for_owner(&self, owner_id: i64) -> Result<u64, AccessError> {
        let mut grants = self
            .grants
            .write()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        let before = grants.len();
        grants.retain(|g| g.owner_id != owner_id);
        Ok((before - grants.len()) as u64)
    }
}

/// In-memory role bridge with a call counter on the access predicate, so
/// tests can assert the direct-check short-circuit.
pub struct MockRoleBridge {
    groups: Arc<RwLock<HashMap<i64, Group>>>,
    roles_by_owner: RwLock<HashMap<i64, HashSet<i64>>>,
    role_grants: RwLock<Vec<(i64, i64, String)>>,
    predicate_calls: AtomicUsize,
}

impl MockRoleBridge {
    /// Creates a bridge sharing `catalog`'s group map.
    pub fn new(catalog: &MockGroupRepository) -> Self {
        Self {
            groups: catalog.catalog(),
            roles_by_owner: RwLock::new(HashMap::new()),
            role_grants: RwLock::new(Vec::new()),
            predicate_calls: AtomicUsize::new(0),
        }
    }

    /// Assigns a role to an owner.
    pub fn assign_role(&self, owner_id: i64, role_id: i64) {
        let mut roles = self.roles_by_owner.write().expect("lock poisoned");
        roles.entry(owner_id).or_default().insert(role_id);
    }

    /// Grants an access level on a group to a role.
    pub fn grant_role_access(&self, role_id: i64, group_id: i64, access: &str) {
        let mut grants = self.role_grants.write().expect("lock poisoned");
        grants.push((role_id, group_id, access.to_owned()));
    }

    /// How many times [`RoleBridge::has_role_access`] was invoked.
    pub fn predicate_calls(&self) -> usize {
        self.predicate_calls.load(Ordering::SeqCst)
    }

    fn group_is_active(&self, group_id: i64) -> Result<bool, AccessError> {
        let groups = self
            .groups
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(groups.get(&group_id).is_some_and(|g| g.active))
    }

    fn owner_roles(&self, owner_id: i64) -> Result<HashSet<i64>, AccessError> {
        let roles = self
            .roles_by_owner
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(roles.get(&owner_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl RoleBridge for MockRoleBridge {
    async fn role_ids(&self, owner_id: i64) -> Result<HashSet<i64>, AccessError> {
        self.owner_roles(owner_id)
    }

    async fn has_role_access(
        &self,
        owner_id: i64,
        group_id: i64,
        levels: &[String],
    ) -> Result<bool, AccessError> {
        self.predicate_calls.fetch_add(1, Ordering::SeqCst);

        if !self.group_is_active(group_id)? {
            return Ok(false);
        }

        let roles = self.owner_roles(owner_id)?;
        let grants = self
            .role_grants
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(grants.iter().any(|(role_id, gid, access)| {
            roles.contains(role_id) && *gid == group_id && levels.contains(access)
        }))
    }

    async fn group_ids_via_roles(
        &self,
        owner_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError> {
        let roles = self.owner_roles(owner_id)?;
        let grants = self
            .role_grants
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;

        let mut ids = HashSet::new();
        for (role_id, group_id, access) in grants.iter() {
            if roles.contains(role_id) && levels.contains(access) && self.group_is_active(*group_id)?
            {
                ids.insert(*group_id);
            }
        }
        Ok(ids)
    }

    async fn owner_ids_via_roles(
        &self,
        group_id: i64,
        levels: &[String],
    ) -> Result<HashSet<i64>, AccessError> {
        if !self.group_is_active(group_id)? {
            return Ok(HashSet::new());
        }

        let matching_roles: HashSet<i64> = {
            let grants = self
                .role_grants
                .read()
                .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
            grants
                .iter()
                .filter(|(_, gid, access)| *gid == group_id && levels.contains(access))
                .map(|(role_id, _, _)| *role_id)
                .collect()
        };

        let roles = self
            .roles_by_owner
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(roles
            .iter()
            .filter(|(_, held)| held.intersection(&matching_roles).next().is_some())
            .map(|(owner_id, _)| *owner_id)
            .collect())
    }
}

/// Records invalidated owner ids for assertions.
#[derive(Default)]
pub struct MockOwnerCache {
    invalidations: RwLock<Vec<i64>>,
}

impl MockOwnerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner ids invalidated so far, in call order.
    pub fn invalidated(&self) -> Vec<i64> {
        self.invalidations.read().expect("lock poisoned").clone()
    }
}

impl OwnerCache for MockOwnerCache {
    fn invalidate(&self, owner_id: i64) {
        self.invalidations
            .write()
            .expect("lock poisoned")
            .push(owner_id);
    }
}
