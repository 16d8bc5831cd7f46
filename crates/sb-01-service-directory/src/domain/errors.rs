//! Service directory error types.

use shared_types::{BrokerError, InterfaceName, ProtocolError};
use thiserror::Error;

/// Errors from registering or resolving services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The interface already has a factory and the policy is `Reject`.
    #[error("Service already registered: {0}")]
    AlreadyRegistered(InterfaceName),

    /// Nothing is registered under the interface; the endpoint was closed.
    #[error("No such service: {0}")]
    NoSuchService(InterfaceName),

    /// The directory channel is gone.
    #[error("Directory channel disconnected")]
    Disconnected,

    /// A directory request could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<DirectoryError> for BrokerError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NoSuchService(name) => BrokerError::NotFound(name.to_string()),
            DirectoryError::Disconnected | DirectoryError::Protocol(_) => {
                BrokerError::Disconnected
            }
            DirectoryError::AlreadyRegistered(name) => {
                BrokerError::Fatal(format!("duplicate service registration: {name}"))
            }
        }
    }
}
