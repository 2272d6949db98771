//! Subscription descriptors
//!
//! A subscription pairs an observer with its delivery preferences: which
//! kinds it wants, how early it is served, whether delivery happens on the
//! publisher's thread, and whether it gets the last event on registration.

use uuid::Uuid;

use super::events::{Event, EventKind};
use super::observer::ObserverHandle;

/// Subscription handle for removing one specific registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific event kinds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events of any of these kinds.
    Kinds(Vec<EventKind>),
}

impl EventFilter {
    /// Build a filter from a set of kinds; an empty set means all kinds
    pub fn kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        let mut kinds: Vec<EventKind> = kinds.into_iter().collect();
        if kinds.is_empty() {
            return EventFilter::All;
        }
        kinds.sort();
        kinds.dedup();
        EventFilter::Kinds(kinds)
    }

    /// Check if an event kind matches this filter
    pub fn accepts(&self, kind: EventKind) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Kinds(kinds) => kinds.is_empty() || kinds.contains(&kind),
        }
    }

    /// Check if an event matches this filter
    pub fn matches(&self, event: &Event) -> bool {
        self.accepts(event.kind())
    }
}

/// Observer registration request
#[derive(Clone)]
pub struct Subscription {
    pub(crate) observer: ObserverHandle,
    pub(crate) filter: EventFilter,
    pub(crate) priority: i32,
    pub(crate) asynchronous: bool,
    pub(crate) durable: bool,
}

impl Subscription {
    /// Subscription to every kind, priority 0, synchronous, not durable
    pub fn new(observer: ObserverHandle) -> Self {
        Self {
            observer,
            filter: EventFilter::All,
            priority: 0,
            asynchronous: false,
            durable: false,
        }
    }

    /// Restrict delivery to the given kinds (empty means all)
    pub fn filter(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.filter = EventFilter::kinds(kinds);
        self
    }

    /// Higher priorities are served first
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Deliver on a worker instead of the publisher's thread
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Replay the last event of each matching kind on registration
    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// The observer this subscription delivers to
    pub fn observer(&self) -> &ObserverHandle {
        &self.observer
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("observer", &self.observer.name())
            .field("filter", &self.filter)
            .field("priority", &self.priority)
            .field("asynchronous", &self.asynchronous)
            .field("durable", &self.durable)
            .finish()
    }
}

/// A subscription as stored by the bus
pub(crate) struct Registered {
    pub(crate) id: SubscriptionId,
    pub(crate) subscription: Subscription,
}

impl Registered {
    pub(crate) fn new(subscription: Subscription) -> Self {
        Self {
            id: SubscriptionId::new(),
            subscription,
        }
    }

    pub(crate) fn info(&self) -> SubscriptionInfo {
        let sub = &self.subscription;
        SubscriptionInfo {
            id: self.id,
            observer: sub.observer.name().to_string(),
            filter: sub.filter.clone(),
            priority: sub.priority,
            asynchronous: sub.asynchronous,
            durable: sub.durable,
        }
    }
}

/// Read-only view of a registered subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// Registration handle.
    pub id: SubscriptionId,
    /// Observer name.
    pub observer: String,
    /// Kinds delivered.
    pub filter: EventFilter,
    /// Delivery priority.
    pub priority: i32,
    /// Delivered on a worker.
    pub asynchronous: bool,
    /// Receives last-event replay on registration.
    pub durable: bool,
}
