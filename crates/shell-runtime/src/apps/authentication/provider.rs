//! Outbound port to the platform's account and token store.

use sb_04_pending_requests::ActionDescriptor;
use shared_types::BrokerError;
use thiserror::Error;

/// Why a token could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The user can fix this by completing `action`; the call may then be
    /// retried with the same parameters.
    #[error("User action required: {}", .0.action)]
    Recoverable(ActionDescriptor),

    /// Nothing the user can do. The message is passed to the caller as is.
    #[error("{0}")]
    Failed(String),
}

impl From<TokenError> for BrokerError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Recoverable(action) => BrokerError::RecoverableAuthorization {
                reason: action.action,
            },
            TokenError::Failed(reason) => BrokerError::Fatal(reason),
        }
    }
}

/// Source of OAuth2 tokens.
///
/// Calls are made from the authentication loop and must not block for long.
pub trait TokenProvider: Send + Sync {
    /// Token for `account` covering `scope` (`oauth2:` followed by the
    /// space-separated scopes).
    fn get_token(&self, account: &str, scope: &str) -> Result<String, TokenError>;

    /// Forget `token` so the next request mints a fresh one.
    fn clear_token(&self, token: &str) -> Result<(), TokenError>;
}
