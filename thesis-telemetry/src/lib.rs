//! # thesis-telemetry
//!
//! Tracing setup shared by the retrieval engine's binaries and tests.
//!
//! - [`init_telemetry`]: human-readable logs filtered by `RUST_LOG`
//! - [`init_json_telemetry`]: one JSON object per line, for log shipping
//! - [`init_with_capture`]: logs plus an in-memory [`capture::SharedEventStorage`]
//!
//! Filtering defaults to `info` when `RUST_LOG` is unset.

pub mod capture;

pub use capture::{CapturedEvent, EventCaptureLayer, SharedEventStorage};

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global subscriber writing human-readable logs to stderr.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(service_name: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()?;
    tracing::debug!(service.name = service_name, "telemetry initialised");
    Ok(())
}

/// Install a global subscriber writing JSON lines to stderr.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_json_telemetry(service_name: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_current_span(true).with_writer(std::io::stderr))
        .try_init()?;
    tracing::debug!(service.name = service_name, "telemetry initialised");
    Ok(())
}

/// Install a global subscriber that also records every event into `storage`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_with_capture(service_name: &str, storage: SharedEventStorage) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EventCaptureLayer::new(storage))
        .try_init()?;
    tracing::debug!(service.name = service_name, "telemetry initialised");
    Ok(())
}

/// A subscriber that only captures events, for scoping with
/// [`tracing::subscriber::set_default`] in tests.
pub fn capture_subscriber(storage: SharedEventStorage) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::registry().with(EventCaptureLayer::new(storage))
}
