//! homebus Settings Crate
//!
//! Loads, validates and stores the bus and logging configuration.

pub mod config;
pub mod error;
pub mod persistence;

pub use config::{LogFormat, LoggingSettings, Settings};
pub use error::{SettingsError, SettingsResult};
pub use persistence::SettingsPersistence;
