//! Core types for group access control.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An access-controlled resource owners are granted levels on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier.
    pub id: i64,
    /// Unique human-readable name.
    pub name: String,
    /// Inactive groups are excluded from all access computations.
    pub active: bool,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
    /// When the group was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A direct owner-to-group access grant.
///
/// One row per access level: an owner holding "read" and "write" on a
/// group is stored as two grants. Grants are only ever written in bulk -
/// the whole set for an owner is replaced atomically, never patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupGrant {
    /// Unique identifier.
    pub id: i64,
    /// The owner holding the grant.
    pub owner_id: i64,
    /// The group the grant applies to.
    pub group_id: i64,
    /// The granted access level.
    pub access: String,
    /// When the grant was created.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a group.
#[derive(Debug, Clone)]
pub struct CreateGroup {
    pub name: String,
    pub active: bool,
}

/// A grant awaiting insertion, stamped with the owner id at commit time.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateGrant {
    pub group_id: i64,
    pub access: String,
}

/// A group identifier: a raw id or a loaded [`Group`] record.
///
/// Query entry points accept `impl Into<GroupRef>` so callers can pass
/// whichever they hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRef {
    Id(i64),
}

impl GroupRef {
    /// The underlying group id.
    pub fn id(self) -> i64 {
        match self {
            Self::Id(id) => id,
        }
    }
}

impl From<i64> for GroupRef {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&Group> for GroupRef {
    fn from(group: &Group) -> Self {
        Self::Id(group.id)
    }
}

impl From<Group> for GroupRef {
    fn from(group: Group) -> Self {
        Self::Id(group.id)
    }
}
