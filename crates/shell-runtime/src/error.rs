//! Runtime errors surfaced to the binary.

use shared_types::{ApplicationName, BrokerError};
use thiserror::Error;

/// Why [`crate::ShellRuntime::run`] stopped other than by request.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The startup application could not be started.
    #[error("Startup application {name} failed: {source}")]
    StartupFailed {
        name: ApplicationName,
        #[source]
        source: BrokerError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("Failed to wait for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}
