//! In-memory staging of direct grants ahead of an atomic commit.
//!
//! Writes are two-phase: `stage_*` calls buffer normalized pending grants
//! without touching the store, and
//! [`commit`](super::GroupAccessResolver::commit) replaces the owner's
//! persisted grant set with the buffer in one transaction. Hosts creating
//! a not-yet-persisted owner hold the buffer until the owner has an id,
//! then commit from their save path.

use super::types::CreateGrant;

/// Where a staged grant points: a resolved group id, or a name that did
/// not resolve and will fail the commit.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingGroup {
    Id(i64),
    /// Name lookups defer their failure to commit time; the whole commit
    /// is rejected before any store mutation.
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingGrant {
    pub(crate) group: PendingGroup,
    pub(crate) access: String,
}

/// A buffer of pending direct grants for one owner.
///
/// Owned by the staging call site; not shared across requests. Cleared
/// only by a successful commit - a failed commit keeps the buffer for
/// inspection or retry.
#[derive(Debug, Clone, Default)]
pub struct StagedGrants {
    pending: Vec<PendingGrant>,
}

impl StagedGrants {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged entries.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops all staged entries without committing.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn push(&mut self, group: PendingGroup, access: String) {
        self.pending.push(PendingGrant { group, access });
    }

    pub(crate) fn entries(&self) -> &[PendingGrant] {
        &self.pending
    }

    /// Stamps every resolved entry into a [`CreateGrant`], or returns the
    /// first unresolved group name.
    pub(crate) fn resolve(&self) -> Result<Vec<CreateGrant>, String> {
        let mut grants = Vec::with_capacity(self.pending.len());
        for entry in &self.pending {
            match &entry.group {
                PendingGroup::Id(group_id) => grants.push(CreateGrant {
                    group_id: *group_id,
                    access: entry.access.clone(),
                }),
                PendingGroup::Unresolved(name) => return Err(name.clone()),
            }
        }
        Ok(grants)
    }
}
