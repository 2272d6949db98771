//! Event type definitions for the event bus.
//!
//! Events are immutable once built. The bus wraps each published event in an
//! `Arc` and hands the same instance to every matching observer.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Kind tag carried by every event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Temperature sensor reading.
    TemperatureReading,
    /// Humidity sensor reading.
    HumidityReading,
    /// Motion sensor trigger.
    MotionDetected,
    /// System-level alert.
    SystemAlert,
    /// Periodic liveness signal.
    Heartbeat,
}

impl EventKind {
    /// Number of event kinds
    pub const COUNT: usize = 5;

    /// Every kind, in declaration order
    pub const ALL: [EventKind; EventKind::COUNT] = [
        EventKind::TemperatureReading,
        EventKind::HumidityReading,
        EventKind::MotionDetected,
        EventKind::SystemAlert,
        EventKind::Heartbeat,
    ];

    /// Stable slot index, used by the last-event cache
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::TemperatureReading => write!(f, "TEMPERATURE_READING"),
            EventKind::HumidityReading => write!(f, "HUMIDITY_READING"),
            EventKind::MotionDetected => write!(f, "MOTION_DETECTED"),
            EventKind::SystemAlert => write!(f, "SYSTEM_ALERT"),
            EventKind::Heartbeat => write!(f, "HEARTBEAT"),
        }
    }
}

/// A published event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    kind: EventKind,
    source: String,
    value: f64,
    timestamp: DateTime<Local>,
}

impl Event {
    /// Create an event stamped with the current local time
    pub fn new(kind: EventKind, source: impl Into<String>, value: f64) -> Self {
        Self {
            kind,
            source: source.into(),
            value,
            timestamp: Local::now(),
        }
    }

    /// Event kind
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Identifier of the producer
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Numeric payload
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Creation time
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} from {} = {:.2}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.kind,
            self.source,
            self.value
        )
    }
}
