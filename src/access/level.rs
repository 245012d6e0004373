//! Access-level specifiers and normalization.
//!
//! Access levels are an open string set ("read", "write", "full", plus
//! whatever the host application defines). `"full"` is special: a grant of
//! `"full"` satisfies any access query, so every normalized level list
//! carries it.

use crate::AccessError;

/// The sentinel level implicitly included in every query and grant set.
///
/// An owner holding `"full"` on a group passes any access check against
/// that group.
pub const FULL_LEVEL: &str = "full";

/// An access-level specifier: a single level or a list of levels.
///
/// Built from plain strings or vectors, so call sites can pass whichever
/// shape they have:
///
/// ```rust
/// use cordon::AccessSpec;
///
/// let single: AccessSpec = "read".into();
/// let many: AccessSpec = vec!["read", "write"].into();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum AccessSpec {
    Single(String),
    Many(Vec<String>),
}

impl From<&str> for AccessSpec {
    fn from(level: &str) -> Self {
        Self::Single(level.to_owned())
    }
}

impl From<String> for AccessSpec {
    fn from(level: String) -> Self {
        Self::Single(level)
    }
}

impl From<Vec<String>> for AccessSpec {
    fn from(levels: Vec<String>) -> Self {
        Self::Many(levels)
    }
}

impl From<Vec<&str>> for AccessSpec {
    fn from(levels: Vec<&str>) -> Self {
        Self::Many(levels.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for AccessSpec {
    fn from(levels: &[&str]) -> Self {
        Self::Many(levels.iter().map(|l| (*l).to_owned()).collect())
    }
}

/// Normalizes an access specifier into a de-duplicated level list that
/// always contains [`FULL_LEVEL`].
///
/// First-occurrence order is preserved; `"full"` is appended when not
/// already requested.
///
/// # Returns
///
/// - `Ok(levels)` - Non-empty list containing `"full"` exactly once
/// - `Err(AccessError::InvalidAccess)` - Empty list, or an empty/blank level
pub fn normalize_access(spec: &AccessSpec) -> Result<Vec<String>, AccessError> {
    let raw: Vec<&String> = match spec {
        AccessSpec::Single(level) => vec![level],
        AccessSpec::Many(levels) => {
            if levels.is_empty() {
                return Err(AccessError::InvalidAccess(
                    "access list must not be empty".to_owned(),
                ));
            }
            levels.iter().collect()
        }
    };

    let mut normalized: Vec<String> = Vec::with_capacity(raw.len() + 1);
    for level in raw {
        if level.trim().is_empty() {
            return Err(AccessError::InvalidAccess(
                "access level must not be blank".to_owned(),
            ));
        }
        if !normalized.iter().any(|l| l == level) {
            normalized.push(level.clone());
        }
    }

    if !normalized.iter().any(|l| l == FULL_LEVEL) {
        normalized.push(FULL_LEVEL.to_owned());
    }

    Ok(normalized)
}
