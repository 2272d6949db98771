//! Error handling for homebus
//!
//! Provides the error types surfaced by the bus and a crate-wide
//! [`Error`] used by configuration and wiring code:
//! - Event bus errors (registration, shutdown, worker startup)
//! - Configuration errors (invalid values)
//!
//! All error types use `thiserror` for ergonomic error handling.
//! Observer callbacks return `anyhow::Result`, and those failures never
//! appear here: they are reported to the bus's failure sink instead.

use thiserror::Error;

/// Event bus error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// The observer capability is unusable (blank name)
    #[error("Invalid subscription target: {reason}")]
    InvalidObserver {
        /// Why the observer was refused.
        reason: String,
    },

    /// The bus has been shut down
    #[error("Event bus is shut down")]
    ShutDown,

    /// A worker thread could not be started
    #[error("Failed to spawn worker: {0}")]
    WorkerSpawn(String),
}

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is out of range
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Main error type for homebus
#[derive(Error, Debug)]
pub enum Error {
    /// Event bus error
    #[error(transparent)]
    Bus(#[from] EventBusError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this error means the bus is no longer active
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Error::Bus(EventBusError::ShutDown))
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
