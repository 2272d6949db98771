//! # homebus
//!
//! An in-process event bus for smart-home sensor and system events:
//! - Observers subscribe with a kind filter, a priority and a delivery mode
//! - Synchronous observers run on the publisher's thread, asynchronous ones
//!   on a fixed pool of worker lanes
//! - Durable subscriptions receive the last event of each matching kind
//! - Observer failures are reported, never propagated
//!
//! ## Architecture
//!
//! 1. **homebus-core** - Events, observers, subscriptions, the bus itself
//! 2. **homebus-settings** - JSON/TOML configuration files
//! 3. **homebus** - This facade: re-exports and logging setup

pub use homebus_core::event_bus;
pub use homebus_settings as settings;

pub use homebus_core::{
    observer_fn, BusStats, ConfigError, Error, Event, EventBus, EventBusConfig, EventBusError,
    EventFilter, EventKind, FailureSink, Observer, ObserverFailure, ObserverHandle, Result,
    Subscription, SubscriptionId, SubscriptionInfo, TracingFailureSink,
};

pub use homebus_settings::{LogFormat, LoggingSettings, Settings, SettingsPersistence};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
pub fn init_logging() -> anyhow::Result<()> {
    init_logging_with(&LoggingSettings::default())
}

/// Initialize logging from settings
///
/// Sets up structured logging with:
/// - `RUST_LOG` environment variable support, falling back to `settings.level`
/// - Pretty or JSON output on stdout
/// - Thread names, so asynchronous deliveries show their worker lane
pub fn init_logging_with(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.level.to_ascii_lowercase()))?;

    match settings.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_level(true)
                .with_thread_names(settings.thread_names)
                .with_line_number(true)
                .pretty();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_thread_names(settings.thread_names)
                .json();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    tracing::debug!(version = VERSION, build_date = BUILD_DATE, "Logging initialised");
    Ok(())
}

/// Load settings from `path` (or defaults if missing), initialize logging
/// from them and build an event bus.
pub fn bootstrap(path: &std::path::Path) -> anyhow::Result<EventBus> {
    let persistence = SettingsPersistence::load_or_default(path)?;
    let settings = persistence.settings();
    init_logging_with(&settings.logging)?;
    let bus = EventBus::with_config(settings.bus.clone())?;
    tracing::info!(
        workers = settings.bus.async_workers,
        allow_sync = settings.bus.allow_sync,
        "Event bus ready"
    );
    Ok(bus)
}
