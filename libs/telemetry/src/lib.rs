//! Telemetry bootstrap for the Telnyx adapter services.
//!
//! `install` sets up a `tracing` subscriber (JSON or text, filtered by
//! `RUST_LOG`) and, when `ENABLE_OTEL` and an OTLP endpoint are set, an OTLP
//! span exporter. Metric names live in [`names`]; values are emitted through
//! the `metrics` facade.

use anyhow::Result;

mod config;
pub mod names;
mod tracing_init;

pub use config::{TelemetryConfig, TelemetryProtocol};
pub use tracing_init::{init_telemetry, with_webhook_fields};

/// Installs the subscriber for `service_name`, reading the rest from the
/// environment. Safe to call more than once.
pub fn install(service_name: &str) -> Result<()> {
    init_telemetry(TelemetryConfig::from_env(
        service_name,
        env!("CARGO_PKG_VERSION"),
    ))
}
