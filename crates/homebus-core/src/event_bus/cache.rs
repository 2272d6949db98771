//! Last-event cache backing durable subscriptions.

use parking_lot::RwLock;
use std::sync::Arc;

use super::events::{Event, EventKind};

/// Most recent event per kind.
///
/// One lock per kind, so updates to different kinds never contend and a
/// reader always sees a whole event.
pub(crate) struct LastEventCache {
    slots: [RwLock<Option<Arc<Event>>>; EventKind::COUNT],
}

impl LastEventCache {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| RwLock::new(None)),
        }
    }

    pub(crate) fn store(&self, event: Arc<Event>) {
        let slot = &self.slots[event.kind().index()];
        *slot.write() = Some(event);
    }

    /// Drop the cached event of `kind`
    pub(crate) fn remove(&self, kind: EventKind) {
        *self.slots[kind.index()].write() = None;
    }

    pub(crate) fn get(&self, kind: EventKind) -> Option<Arc<Event>> {
        self.slots[kind.index()].read().clone()
    }

    /// Cached events in kind declaration order
    pub(crate) fn snapshot(&self) -> Vec<Arc<Event>> {
        EventKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind))
            .collect()
    }

    pub(crate) fn clear(&self) {
        for slot in &self.slots {
            *slot.write() = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_replaces_per_kind() {
        let cache = LastEventCache::new();
        cache.store(Arc::new(Event::new(EventKind::Heartbeat, "a", 1.0)));
        cache.store(Arc::new(Event::new(EventKind::Heartbeat, "b", 2.0)));
        cache.store(Arc::new(Event::new(EventKind::SystemAlert, "c", 3.0)));

        let heartbeat = cache.get(EventKind::Heartbeat).expect("cached");
        assert_eq!(heartbeat.source(), "b");
        assert!(cache.get(EventKind::MotionDetected).is_none());
        assert_eq!(cache.snapshot().len(), 2);
    }

    #[test]
    fn test_clear() {
        let cache = LastEventCache::new();
        cache.store(Arc::new(Event::new(EventKind::HumidityReading, "h", 40.0)));
        cache.clear();
        assert!(cache.snapshot().is_empty());
    }

    #[test]
    fn test_remove_single_kind() {
        let cache = LastEventCache::new();
        cache.store(Arc::new(Event::new(EventKind::Heartbeat, "system", 1.0)));
        cache.store(Arc::new(Event::new(EventKind::SystemAlert, "sys", 2.0)));
        cache.remove(EventKind::Heartbeat);

        assert!(cache.get(EventKind::Heartbeat).is_none());
        assert!(cache.get(EventKind::SystemAlert).is_some());
    }
}
