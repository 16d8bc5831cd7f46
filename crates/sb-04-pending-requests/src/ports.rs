//! Outbound port to the host runtime, and what it reports back.

use crate::token::Token;
use serde::{Deserialize, Serialize};

/// What the host runtime should do on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Action identifier understood by the host, e.g. `account-picker`.
    pub action: String,
    /// Text shown to the user, if any.
    pub message: Option<String>,
    /// Opaque host-specific data.
    pub payload: Vec<u8>,
}

impl ActionDescriptor {
    /// Action with no message or payload.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            message: None,
            payload: Vec::new(),
        }
    }

    /// Attach a user-facing message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach host-specific data.
    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }
}

/// Result of an external action as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExternalOutcome {
    /// The user completed the action; carries the host's result data.
    Granted(Vec<u8>),
    /// The user declined.
    Denied,
    /// The host could not run the action.
    Failed(String),
}

impl ExternalOutcome {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Granted(_) => "granted",
            Self::Denied => "denied",
            Self::Failed(_) => "failed",
        }
    }
}

/// Host runtime side of the correlator.
///
/// Fire-and-forget: the result arrives later through a `ResultSender`.
pub trait ExternalActionHost: Send + Sync {
    /// Start `action`, tagging its eventual result with `token`.
    fn request_external_action(&self, token: &Token, action: ActionDescriptor);
}
