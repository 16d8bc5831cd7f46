//! # Error Types
//!
//! The outcome kinds every broker component maps its failures onto.
//!
//! | Kind | Propagation |
//! |------|-------------|
//! | `NotFound` | local, silent; the supplied channel is closed |
//! | `Disconnected` | terminal event for the owner, not a failure |
//! | `RecoverableAuthorization` | drives the only retry path in the core |
//! | `Fatal` | unwinds to the application's top-level entry point |

use thiserror::Error;

/// Error taxonomy shared by all broker crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// Target application or interface has no registration.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The peer closed its end of a channel.
    #[error("Peer disconnected")]
    Disconnected,

    /// The call requires a capability the user has to grant first.
    #[error("Authorization required: {reason}")]
    RecoverableAuthorization { reason: String },

    /// The host runtime cannot start an application or a native capability
    /// is unavailable.
    #[error("Fatal: {0}")]
    Fatal(String),
}

impl BrokerError {
    /// Whether the error is one of the silent, idempotent kinds.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Disconnected)
    }

    /// Whether the error should unwind to the top-level caller.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Errors decoding directory protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The payload was not a valid directory request.
    #[error("Malformed directory request: {0}")]
    Malformed(String),

    /// The request carried the wrong number of endpoints.
    #[error("Expected {expected} endpoint(s), got {actual}")]
    EndpointCount { expected: usize, actual: usize },
}
