//! Telemetry module
//!
//! Structured logging setup

mod logging;

pub use logging::{init_logging, LogFormat};

use crate::config::TelemetryConfig;

/// Initialize all telemetry subsystems.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    let format = config.log_format.parse().unwrap_or(LogFormat::Pretty);
    init_logging(&config.log_level, format)
}
