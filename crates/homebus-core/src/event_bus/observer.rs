//! Observer capability
//!
//! Defines the trait the bus invokes for every delivery.

use std::sync::Arc;

use super::events::Event;

/// Receiver of bus events
///
/// Implement this trait to be notified of published events. Returning an
/// error (or panicking) only affects this observer's own delivery; the bus
/// reports the failure and moves on.
pub trait Observer: Send + Sync {
    /// Called once per delivered event
    fn on_event(&self, event: &Event) -> anyhow::Result<()>;

    /// Human-readable name used in failure reports
    fn name(&self) -> &str;
}

/// Shared observer handle.
///
/// The bus identifies observers by the identity of this handle, so the same
/// `Arc` (or a clone of it) must be passed to `unsubscribe`.
pub type ObserverHandle = Arc<dyn Observer>;

/// Returns true if both handles point at the same observer
pub fn same_observer(a: &ObserverHandle, b: &ObserverHandle) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Observer backed by a closure
pub struct FnObserver<F> {
    name: String,
    handler: F,
}

impl<F> Observer for FnObserver<F>
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, event: &Event) -> anyhow::Result<()> {
        (self.handler)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> std::fmt::Debug for FnObserver<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnObserver").field("name", &self.name).finish()
    }
}

/// Wrap a closure into a shareable observer handle
pub fn observer_fn<F>(name: impl Into<String>, handler: F) -> ObserverHandle
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnObserver {
        name: name.into(),
        handler,
    })
}
