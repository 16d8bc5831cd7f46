//! Prometheus metrics for the broker.
//!
//! All metrics live in a crate-private registry and are rendered on demand
//! with [`gather_metrics`]. Naming follows `sb_<area>_<what>_<unit>`.

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Registry holding every broker metric
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CONNECTION BROKER
    // =========================================================================

    /// Connection requests accepted by the broker
    pub static ref CONNECTIONS_REQUESTED: Counter = Counter::new(
        "sb_connections_requested_total",
        "Connection requests accepted by the broker"
    ).expect("metric creation failed");

    /// Connections dropped because the target could not be started
    pub static ref CONNECTIONS_FAILED: Counter = Counter::new(
        "sb_connections_failed_total",
        "Connection requests dropped because the target failed to start"
    ).expect("metric creation failed");

    /// Application instances currently running
    pub static ref APPLICATIONS_RUNNING: Gauge = Gauge::new(
        "sb_applications_running",
        "Application instances currently running"
    ).expect("metric creation failed");

    // =========================================================================
    // SERVICE DIRECTORY
    // =========================================================================

    /// Service lookups by outcome
    pub static ref SERVICE_LOOKUPS: CounterVec = CounterVec::new(
        Opts::new("sb_service_lookups_total", "Service directory lookups"),
        &["outcome"]  // hit / miss
    ).expect("metric creation failed");

    // =========================================================================
    // PIPE FORWARDER
    // =========================================================================

    /// Messages relayed by pipe forwarders
    pub static ref MESSAGES_FORWARDED: Counter = Counter::new(
        "sb_messages_forwarded_total",
        "Messages relayed by pipe forwarders"
    ).expect("metric creation failed");

    // =========================================================================
    // PENDING REQUESTS
    // =========================================================================

    /// Calls currently suspended on an external action
    pub static ref PENDING_REQUESTS: Gauge = Gauge::new(
        "sb_pending_requests",
        "Calls suspended waiting for an external action result"
    ).expect("metric creation failed");

    /// External action results by outcome
    pub static ref EXTERNAL_RESULTS: CounterVec = CounterVec::new(
        Opts::new("sb_external_results_total", "External action results delivered"),
        &["outcome"]  // granted / denied / unknown / cancelled
    ).expect("metric creation failed");
}

/// Handle for the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the broker registry.
///
/// Registering a second time is not an error; the existing collectors are kept.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CONNECTIONS_REQUESTED.clone()),
        Box::new(CONNECTIONS_FAILED.clone()),
        Box::new(APPLICATIONS_RUNNING.clone()),
        Box::new(SERVICE_LOOKUPS.clone()),
        Box::new(MESSAGES_FORWARDED.clone()),
        Box::new(PENDING_REQUESTS.clone()),
        Box::new(EXTERNAL_RESULTS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Render all registered metrics in Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
