//! Event system for access-control writes.
//!
//! Events are fired from every committed write. If no listeners are
//! registered, they are silently ignored (zero overhead).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cordon::register_event_listeners;
//! use cordon::events::listeners::LoggingListener;
//!
//! fn main() {
//!     // register listeners at startup
//!     register_event_listeners(|registry| {
//!         registry.listen(LoggingListener::new());
//!     });
//!
//!     // grant replacements and purges will now be logged
//! }
//! ```
//!
//! # Custom Listeners
//!
//! Implement the [`Listener`] trait to create custom event handlers:
//!
//! ```rust,ignore
//! use cordon::events::{AccessEvent, Listener};
//! use async_trait::async_trait;
//!
//! struct AuditListener;
//!
//! #[async_trait]
//! impl Listener for AuditListener {
//!     async fn handle(&self, event: &AccessEvent) {
//!         if let AccessEvent::GrantsReplaced { owner_id, .. } = event {
//!             // append to audit trail
//!         }
//!     }
//! }
//! ```

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::AccessEvent;
pub use listener::Listener;
pub use registry::{dispatch, register_event_listeners};
