//! # Shell Runtime
//!
//! Runs the service broker in-process with the bundled applications.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging and metrics
//! 3. Register the bundled applications with the loader registry
//! 4. Connect to the startup application
//! 5. Run until Ctrl+C or a fatal startup failure, then stop every application

use anyhow::{Context, Result};
use broker_telemetry::{gather_metrics, init_telemetry};
use shell_runtime::{ShellConfig, ShellRuntime};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ShellConfig::from_env().context("Failed to load configuration")?;
    let _telemetry = init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Shell Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!(
        duplicate_policy = ?config.broker.duplicate_policy,
        idle_wait = ?config.forwarder.idle_wait,
        startup = ?config.startup.as_ref().map(|name| name.as_str()),
        "Configuration loaded"
    );

    let runtime = ShellRuntime::new(config).context("Invalid configuration")?;

    info!("Shell is running. Press Ctrl+C to stop.");
    let outcome = runtime.run(tokio::signal::ctrl_c()).await;

    match gather_metrics() {
        Ok(metrics) => debug!(%metrics, "Final metrics"),
        Err(err) => warn!(error = %err, "Failed to render metrics"),
    }

    if let Err(err) = &outcome {
        error!(error = %err, "Shell stopped on error");
    }
    outcome.context("Shell stopped on error")?;

    info!("Shutdown complete");
    Ok(())
}
