//! Fault-isolated delivery.
//!
//! Every call into an observer goes through [`safe_notify`]. Errors and
//! panics are turned into an [`ObserverFailure`] and handed to the bus's
//! [`FailureSink`]; nothing escapes to the publisher.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::events::Event;
use super::observer::Observer;

/// Report of one failed delivery
#[derive(Debug, Clone)]
pub struct ObserverFailure {
    /// Name of the observer that failed.
    pub observer: String,
    /// The event being delivered.
    pub event: Arc<Event>,
    /// Error or panic message.
    pub reason: String,
}

impl std::fmt::Display for ObserverFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Observer {} failed handling event {}: {}",
            self.observer, self.event, self.reason
        )
    }
}

/// Operator-visible destination for observer failures
pub trait FailureSink: Send + Sync {
    /// Record one failure
    fn report(&self, failure: &ObserverFailure);
}

/// Default sink, logs failures at `warn`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
    fn report(&self, failure: &ObserverFailure) {
        tracing::warn!(
            observer = %failure.observer,
            kind = %failure.event.kind(),
            source = %failure.event.source(),
            reason = %failure.reason,
            "Observer failed handling event"
        );
    }
}

/// Delivery counters
#[derive(Debug, Default)]
pub(crate) struct BusCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

impl BusCounters {
    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of bus activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Events accepted by `publish`.
    pub published: u64,
    /// Observer calls that returned `Ok`.
    pub delivered: u64,
    /// Observer calls that errored or panicked.
    pub failed: u64,
    /// Publishes, subscriptions and deliveries refused after shutdown.
    pub rejected: u64,
}

/// Everything a delivery needs besides the observer and event
#[derive(Clone)]
pub(crate) struct DeliveryContext {
    pub(crate) sink: Arc<dyn FailureSink>,
    pub(crate) counters: Arc<BusCounters>,
}

/// Invoke an observer, isolating any failure. A panicking sink is contained too.
pub(crate) fn safe_notify(
    observer: &dyn Observer,
    event: &Arc<Event>,
    ctx: &DeliveryContext,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_event(event)));

    let reason = match outcome {
        Ok(Ok(())) => {
            ctx.counters.delivered.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(observer = observer.name(), kind = %event.kind(), "Event delivered");
            return;
        }
        Ok(Err(err)) => format!("{:#}", err),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };

    ctx.counters.failed.fetch_add(1, Ordering::Relaxed);
    let failure = ObserverFailure {
        observer: observer.name().to_string(),
        event: Arc::clone(event),
        reason,
    };
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| ctx.sink.report(&failure))) {
        tracing::error!(
            observer = %failure.observer,
            reason = %failure.reason,
            sink_panic = panic_message(payload.as_ref()),
            "Failure sink panicked while reporting"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::events::EventKind;
    use crate::event_bus::observer::observer_fn;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CollectingSink(Mutex<Vec<ObserverFailure>>);

    impl FailureSink for CollectingSink {
        fn report(&self, failure: &ObserverFailure) {
            self.0.lock().push(failure.clone());
        }
    }

    fn context(sink: Arc<CollectingSink>) -> DeliveryContext {
        DeliveryContext {
            sink,
            counters: Arc::new(BusCounters::default()),
        }
    }

    #[test]
    fn test_success_counts_delivery() {
        let sink = Arc::new(CollectingSink::default());
        let ctx = context(sink.clone());
        let event = Arc::new(Event::new(EventKind::Heartbeat, "system", 1.0));

        let observer = observer_fn("ok", |_| Ok(()));
        safe_notify(observer.as_ref(), &event, &ctx);
        assert_eq!(ctx.counters.snapshot().delivered, 1);
        assert_eq!(ctx.counters.snapshot().failed, 0);
        assert!(sink.0.lock().is_empty());
    }

    #[test]
    fn test_error_is_reported() {
        let sink = Arc::new(CollectingSink::default());
        let ctx = context(sink.clone());
        let event = Arc::new(Event::new(EventKind::MotionDetected, "sensor-M0", 1.0));

        let observer = observer_fn("flaky", |_| anyhow::bail!("simulated random failure"));
        safe_notify(observer.as_ref(), &event, &ctx);

        let failures = sink.0.lock();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].observer, "flaky");
        assert_eq!(failures[0].reason, "simulated random failure");
        assert_eq!(ctx.counters.snapshot().failed, 1);
    }

    #[test]
    fn test_panic_is_contained() {
        let sink = Arc::new(CollectingSink::default());
        let ctx = context(sink.clone());
        let event = Arc::new(Event::new(EventKind::SystemAlert, "sys", 0.0));

        let observer = observer_fn("boom", |_| panic!("observer exploded"));
        safe_notify(observer.as_ref(), &event, &ctx);

        let failures = sink.0.lock();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].reason.contains("observer exploded"));
        assert_eq!(ctx.counters.snapshot().delivered, 0);
    }

    struct PanickingSink;

    impl FailureSink for PanickingSink {
        fn report(&self, _failure: &ObserverFailure) {
            panic!("sink unavailable");
        }
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let ctx = DeliveryContext {
            sink: Arc::new(PanickingSink),
            counters: Arc::new(BusCounters::default()),
        };
        let event = Arc::new(Event::new(EventKind::Heartbeat, "system", 1.0));

        let observer = observer_fn("flaky", |_| anyhow::bail!("simulated random failure"));
        safe_notify(observer.as_ref(), &event, &ctx);

        assert_eq!(ctx.counters.snapshot().failed, 1);
    }

    #[test]
    fn test_failure_display() {
        let failure = ObserverFailure {
            observer: "OpsTeam".to_string(),
            event: Arc::new(Event::new(EventKind::SystemAlert, "sys", 0.0)),
            reason: "channel down".to_string(),
        };
        let text = failure.to_string();
        assert!(text.starts_with("Observer OpsTeam failed handling event ["));
        assert!(text.ends_with("SYSTEM_ALERT from sys = 0.00: channel down"));
    }
}
