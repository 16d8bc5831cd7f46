//! Outcomes a suspended call can end with other than success.

use shared_types::BrokerError;
use thiserror::Error;

/// Message delivered when the user declines an external action.
pub const USER_DENIED: &str = "User denied the request.";

/// Why a suspended call did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PendingError {
    /// The user declined the external action.
    #[error("{0}")]
    Denied(String),

    /// The host runtime could not complete the external action.
    #[error("{0}")]
    Failed(String),

    /// The request was cancelled before the host reported back.
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// The call still needed authorization after its retries were used up.
    #[error("Authorization still required after {attempts} retry attempt(s)")]
    RetryExhausted { attempts: u32 },
}

impl PendingError {
    /// Denial with the standard message.
    #[must_use]
    pub fn user_denied() -> Self {
        Self::Denied(USER_DENIED.to_string())
    }
}

impl From<PendingError> for BrokerError {
    fn from(err: PendingError) -> Self {
        match err {
            PendingError::Denied(_) | PendingError::RetryExhausted { .. } => {
                BrokerError::RecoverableAuthorization {
                    reason: err.to_string(),
                }
            }
            PendingError::Failed(_) | PendingError::Cancelled(_) => BrokerError::Disconnected,
        }
    }
}
