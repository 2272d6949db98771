//! # Event Bus Module
//!
//! In-process publish/subscribe for sensor and system events.
//!
//! ## Overview
//!
//! - Publishers hand events to the bus without knowing who listens
//! - Subscriptions choose kinds, priority, sync/async delivery and durability
//! - Higher-priority subscriptions are served first; ties keep registration order
//! - Durable subscriptions receive the last event of each matching kind on registration
//! - A failing observer is reported and skipped, never propagated
//!
//! ## Usage
//!
//! ```rust,ignore
//! use homebus_core::event_bus::{observer_fn, Event, EventBus, EventKind, Subscription};
//!
//! let bus = EventBus::new()?;
//!
//! let alerts = observer_fn("OpsTeam", |event| {
//!     println!("!!! ALERT: {}", event);
//!     Ok(())
//! });
//! bus.subscribe(Subscription::new(alerts.clone()).filter([EventKind::SystemAlert]).priority(80))?;
//!
//! bus.publish(Event::new(EventKind::SystemAlert, "sys", 0.0))?;
//!
//! bus.unsubscribe(&alerts);
//! bus.shutdown();
//! ```

mod bus;
mod cache;
mod dispatch;
mod events;
mod observer;
mod subscription;
mod worker;

pub use bus::{EventBus, EventBusConfig};
pub use dispatch::{BusStats, FailureSink, ObserverFailure, TracingFailureSink};
pub use events::{Event, EventKind};
pub use observer::{observer_fn, same_observer, FnObserver, Observer, ObserverHandle};
pub use subscription::{EventFilter, Subscription, SubscriptionId, SubscriptionInfo};
