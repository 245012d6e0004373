use chrono::{DateTime, Utc};

/// Access-control events emitted by committed writes.
///
/// Events are always fired. If no listeners are registered, they are
/// silently ignored (no-op). Register listeners via
/// [`register_event_listeners`](crate::register_event_listeners) to handle
/// events.
#[derive(Debug, Clone)]
pub enum AccessEvent {
    /// An owner's entire direct grant set was atomically replaced.
    GrantsReplaced {
        owner_id: i64,
        grant_count: usize,
        at: DateTime<Utc>,
    },
    /// All of an owner's direct grants were removed ahead of owner
    /// deletion.
    GrantsPurged {
        owner_id: i64,
        at: DateTime<Utc>,
    },
}

impl AccessEvent {
    /// Returns a dot-separated event name for logging/tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GrantsReplaced { .. } => "access.grants.replaced",
            Self::GrantsPurged { .. } => "access.grants.purged",
        }
    }
}
