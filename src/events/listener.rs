use async_trait::async_trait;

use super::AccessEvent;

/// Trait for handling access events asynchronously.
///
/// Implement this trait to create custom event listeners. Listeners can
/// perform any async operation: logging, audit trails, metrics, cache
/// warming, etc.
///
/// # Example
///
/// ```rust,ignore
/// use cordon::events::{AccessEvent, Listener};
/// use async_trait::async_trait;
///
/// struct MetricsListener;
///
/// #[async_trait]
/// impl Listener for MetricsListener {
///     async fn handle(&self, event: &AccessEvent) {
///         if let AccessEvent::GrantsReplaced { grant_count, .. } = event {
///             // record grant set size
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Handle an access event.
    ///
    /// This method is called for every event dispatched. Filter by matching
    /// on the event variant to handle specific events.
    async fn handle(&self, event: &AccessEvent);
}
