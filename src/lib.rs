pub mod access;
pub mod events;

#[cfg(feature = "sqlx_sqlite")]
pub mod sqlite;

pub use access::GroupAccessResolver;
pub use events::register_event_listeners;
pub use access::StagedGrants;
pub use access::{normalize_access, AccessSpec, FULL_LEVEL};
pub use access::{CreateGrant, CreateGroup, Group, GroupGrant, GroupRef};
pub use access::{
    GrantRow, GroupGrantRepository, GroupRepository, NoopOwnerCache, OwnerCache, OwnerDirectory,
    RoleBridge,
};

#[cfg(feature = "mocks")]
pub use access::{MockGroupGrantRepository, MockGroupRepository, MockOwnerCache, MockRoleBridge};

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AccessError {
    /// Access specifier was empty or contained an empty level.
    InvalidAccess(String),
    /// A group name staged for commit did not resolve to any group.
    UnknownGroup(String),
    NotFound,
    DatabaseError(String),
    Internal(String),
}

impl std::error::Error for AccessError {}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::InvalidAccess(msg) => write!(f, "Invalid access specifier: {msg}"),
            AccessError::UnknownGroup(name) => write!(f, "Unknown group: {name}"),
            AccessError::NotFound => write!(f, "Record not found"),
            AccessError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            AccessError::Internal(msg) => write!(f, "{msg}"),
        }
    }
}
