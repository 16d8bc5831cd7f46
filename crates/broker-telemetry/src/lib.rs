//! # Broker Telemetry
//!
//! Logging and metrics shared by every broker crate.
//!
//! ## Components
//!
//! - **Logging**: `tracing` subscriber with an env filter, pretty or JSON output
//! - **Metrics**: Prometheus counters and gauges, rendered on demand
//!
//! ## Usage
//!
//! ```rust,ignore
//! use broker_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `shell-broker` | Service name attached to logs |
//! | `SB_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `SB_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |
//! | `SB_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |

#![warn(missing_docs)]

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    gather_metrics, register_metrics, MetricsHandle, APPLICATIONS_RUNNING, CONNECTIONS_FAILED,
    CONNECTIONS_REQUESTED, EXTERNAL_RESULTS, MESSAGES_FORWARDED, PENDING_REQUESTS,
    SERVICE_LOOKUPS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A metric could not be registered.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// The configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(config)?;

    Ok(TelemetryGuard { _metrics: metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
