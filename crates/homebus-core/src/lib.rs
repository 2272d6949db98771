//! # homebus Core
//!
//! Event types, observer capability, and the prioritised in-process
//! event bus used by homebus.

pub mod error;
pub mod event_bus;

pub use error::{ConfigError, Error, EventBusError, Result};

pub use event_bus::{
    observer_fn, BusStats, Event, EventBus, EventBusConfig, EventFilter, EventKind, FailureSink,
    Observer, ObserverFailure, ObserverHandle, Subscription, SubscriptionId, SubscriptionInfo,
    TracingFailureSink,
};
