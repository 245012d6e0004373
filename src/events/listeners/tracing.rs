use async_trait::async_trait;

use crate::events::{AccessEvent, Listener};

/// Emits access events as tracing events.
///
/// Requires the `tracing` feature to be enabled.
///
/// # Example
///
/// ```rust,ignore
/// use cordon::register_event_listeners;
/// use cordon::events::listeners::TracingListener;
///
/// register_event_listeners(|registry| {
///     registry.listen(TracingListener);
/// });
/// ```
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &AccessEvent) {
        tracing::info!(
            target: "cordon::events",
            event_name = event.name(),
            ?event,
            "access event"
        );
    }
}
