//! Event Bus implementation.
//!
//! Provides the core EventBus struct and its configuration.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::cache::LastEventCache;
use super::dispatch::{
    safe_notify, BusCounters, BusStats, DeliveryContext, FailureSink, TracingFailureSink,
};
use super::events::{Event, EventKind};
use super::observer::{same_observer, ObserverHandle};
use super::subscription::{Registered, Subscription, SubscriptionId, SubscriptionInfo};
use super::worker::{DrainOutcome, WorkerPool};
use crate::error::{ConfigError, EventBusError};

/// Configuration for the event bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// Number of worker lanes for asynchronous delivery.
    pub async_workers: usize,
    /// Whether synchronous subscriptions run on the publisher's thread.
    /// When false every delivery goes through the worker pool.
    pub allow_sync: bool,
    /// How long shutdown waits for queued deliveries, in milliseconds.
    pub shutdown_grace_ms: u64,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            async_workers: 4,
            allow_sync: true,
            shutdown_grace_ms: 3000,
        }
    }
}

impl EventBusConfig {
    /// Shutdown grace period
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.async_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "async_workers".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

type SubscriberList = Arc<Vec<Arc<Registered>>>;

/// In-process event bus with prioritised, fault-isolated delivery
pub struct EventBus {
    /// Subscriptions in non-increasing priority order; replaced wholesale on change
    subscribers: RwLock<SubscriberList>,
    /// Last event per kind, for durable subscriptions
    last_events: LastEventCache,
    /// Lanes for asynchronous delivery
    pool: WorkerPool,
    /// Failure sink and counters shared with worker jobs
    ctx: DeliveryContext,
    shut_down: AtomicBool,
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Result<Self, EventBusError> {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Result<Self, EventBusError> {
        Self::with_sink(config, Arc::new(TracingFailureSink))
    }

    /// Create a new event bus that reports observer failures to `sink`
    pub fn with_sink(
        config: EventBusConfig,
        sink: Arc<dyn FailureSink>,
    ) -> Result<Self, EventBusError> {
        let pool = WorkerPool::new(config.async_workers)?;
        Ok(Self {
            subscribers: RwLock::new(Arc::new(Vec::new())),
            last_events: LastEventCache::new(),
            pool,
            ctx: DeliveryContext {
                sink,
                counters: Arc::new(BusCounters::default()),
            },
            shut_down: AtomicBool::new(false),
            config,
        })
    }

    /// Register an observer
    ///
    /// Durable subscriptions immediately receive the last event of every
    /// kind their filter accepts, using the same sync/async rule as a
    /// publish. Registering the same observer twice is allowed; both
    /// registrations receive events.
    pub fn subscribe(&self, subscription: Subscription) -> Result<SubscriptionId, EventBusError> {
        if self.is_shutdown() {
            self.ctx.counters.record_rejected();
            tracing::warn!(
                observer = subscription.observer.name(),
                "Subscribe ignored, bus is shut down"
            );
            return Err(EventBusError::ShutDown);
        }
        if subscription.observer.name().trim().is_empty() {
            return Err(EventBusError::InvalidObserver {
                reason: "observer name is empty".to_string(),
            });
        }

        let entry = Arc::new(Registered::new(subscription));
        {
            let mut subscribers = self.subscribers.write();
            let mut next = Vec::with_capacity(subscribers.len() + 1);
            next.extend(subscribers.iter().cloned());
            next.push(Arc::clone(&entry));
            // Stable: equal priorities keep registration order.
            next.sort_by_key(|r| Reverse(r.subscription.priority));
            *subscribers = Arc::new(next);
        }

        let sub = &entry.subscription;
        tracing::debug!(
            id = %entry.id,
            observer = sub.observer.name(),
            priority = sub.priority,
            asynchronous = sub.asynchronous,
            durable = sub.durable,
            "Subscription added"
        );

        if sub.durable {
            for event in self.last_events.snapshot() {
                if sub.filter.matches(&event) {
                    self.deliver(sub, &event);
                }
            }
        }

        Ok(entry.id)
    }

    /// Remove every subscription of `observer`
    ///
    /// Returns the number of subscriptions removed. Deliveries already queued
    /// for the observer may still run.
    pub fn unsubscribe(&self, observer: &ObserverHandle) -> usize {
        let removed = self.remove_where(|r| same_observer(&r.subscription.observer, observer));
        if removed > 0 {
            tracing::debug!(observer = observer.name(), removed, "Observer unsubscribed");
        }
        removed
    }

    /// Remove one subscription
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe_id(&self, id: SubscriptionId) -> bool {
        let removed = self.remove_where(|r| r.id == id) > 0;
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Publish an event to all matching subscriptions
    ///
    /// Synchronous subscribers have run by the time this returns;
    /// asynchronous ones are only queued. Returns the number of deliveries
    /// performed or queued.
    pub fn publish(&self, event: Event) -> Result<usize, EventBusError> {
        if self.is_shutdown() {
            self.ctx.counters.record_rejected();
            tracing::warn!(kind = %event.kind(), source = event.source(), "Publish ignored, bus is shut down");
            return Err(EventBusError::ShutDown);
        }

        let event = Arc::new(event);
        self.last_events.store(Arc::clone(&event));
        if self.is_shutdown() {
            // Shutdown raced this publish and may already have cleared the cache.
            self.last_events.remove(event.kind());
            self.ctx.counters.record_rejected();
            tracing::warn!(kind = %event.kind(), source = event.source(), "Publish ignored, bus is shut down");
            return Err(EventBusError::ShutDown);
        }
        self.ctx.counters.record_published();

        let snapshot = Arc::clone(&*self.subscribers.read());
        let mut deliveries = 0;
        for entry in snapshot.iter() {
            let sub = &entry.subscription;
            if sub.filter.matches(&event) && self.deliver(sub, &event) {
                deliveries += 1;
            }
        }

        tracing::trace!(kind = %event.kind(), deliveries, "Event published");
        Ok(deliveries)
    }

    /// Shut the bus down
    ///
    /// Waits up to the configured grace period for queued asynchronous
    /// deliveries, then discards the rest. Later calls are no-ops. When
    /// called from an asynchronous callback the wait happens in the
    /// background and this returns immediately.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::debug!("Event bus already shut down");
            return;
        }

        match self.pool.shutdown(self.config.shutdown_grace()) {
            DrainOutcome::Drained => tracing::info!("Event bus shut down"),
            DrainOutcome::TimedOut { abandoned } => tracing::warn!(
                abandoned,
                grace_ms = self.config.shutdown_grace_ms,
                "Event bus shut down before all deliveries finished"
            ),
            DrainOutcome::Deferred => {
                tracing::info!("Event bus shut down from a worker, draining in background")
            }
            DrainOutcome::AlreadyStopped => {}
        }
        self.last_events.clear();
    }

    /// Whether `shutdown` has been called
    pub fn is_shutdown(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Get the number of registered subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Registered subscriptions in delivery order
    pub fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        self.subscribers.read().iter().map(|r| r.info()).collect()
    }

    /// Most recently published event of `kind`
    pub fn last_event(&self, kind: EventKind) -> Option<Arc<Event>> {
        self.last_events.get(kind)
    }

    /// Delivery counters
    pub fn stats(&self) -> BusStats {
        self.ctx.counters.snapshot()
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Route one delivery; returns false if it was refused
    fn deliver(&self, sub: &Subscription, event: &Arc<Event>) -> bool {
        if !sub.asynchronous && self.config.allow_sync {
            safe_notify(sub.observer.as_ref(), event, &self.ctx);
            return true;
        }

        let observer = Arc::clone(&sub.observer);
        let event = Arc::clone(event);
        let ctx = self.ctx.clone();
        let key = lane_key(&observer);
        let job = Box::new(move || {
            safe_notify(observer.as_ref(), &event, &ctx);
        });

        match self.pool.submit(key, job) {
            Ok(()) => true,
            Err(err) => {
                self.ctx.counters.record_rejected();
                tracing::warn!(observer = sub.observer.name(), error = %err, "Asynchronous delivery dropped");
                false
            }
        }
    }

    fn remove_where(&self, predicate: impl Fn(&Registered) -> bool) -> usize {
        let mut subscribers = self.subscribers.write();
        let next: Vec<_> = subscribers
            .iter()
            .filter(|r| !predicate(r))
            .cloned()
            .collect();
        let removed = subscribers.len() - next.len();
        if removed > 0 {
            *subscribers = Arc::new(next);
        }
        removed
    }
}

/// Lane routing key; one observer always maps to one lane
fn lane_key(observer: &ObserverHandle) -> usize {
    let addr = Arc::as_ptr(observer) as *const () as usize;
    let mut hasher = DefaultHasher::new();
    addr.hash(&mut hasher);
    hasher.finish() as usize
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if !self.is_shutdown() {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("workers", &self.pool.lane_count())
            .field("shut_down", &self.is_shutdown())
            .field("config", &self.config)
            .finish()
    }
}
