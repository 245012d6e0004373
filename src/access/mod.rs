mod level;
mod repository;
mod resolver;
mod staged;
mod types;

pub use level::{normalize_access, AccessSpec, FULL_LEVEL};
pub use repository::{
    GrantRow, GroupGrantRepository, GroupRepository, NoopOwnerCache, OwnerCache, OwnerDirectory,
    RoleBridge,
};
pub use resolver::GroupAccessResolver;
pub use staged::StagedGrants;
pub use types::{CreateGrant, CreateGroup, Group, GroupGrant, GroupRef};

#[cfg(feature = "mocks")]
mod mocks;

#[cfg(feature = "mocks")]
pub use mocks::{MockGroupGrantRepository, MockGroupRepository, MockOwnerCache, MockRoleBridge};
