//! Host runtime error types.

use shared_types::{ApplicationName, BrokerError};
use thiserror::Error;

/// Why the host runtime could not produce an application instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// No loader knows the application.
    #[error("Application not found: {0}")]
    NotFound(ApplicationName),

    /// The application exists but could not be started.
    #[error("Failed to start {name}: {reason}")]
    StartFailed {
        name: ApplicationName,
        reason: String,
    },
}

impl From<HostError> for BrokerError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::NotFound(name) => BrokerError::NotFound(name.to_string()),
            HostError::StartFailed { name, reason } => {
                BrokerError::Fatal(format!("failed to start {name}: {reason}"))
            }
        }
    }
}
