//! Start failures reported by the broker.

use shared_types::{ApplicationName, BrokerError};

/// An application that could not be created or initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFailure {
    /// Instance key of the application (query stripped, aliases applied).
    pub name: ApplicationName,
    /// Why it failed. `Fatal` for anything other than an unknown name.
    pub error: BrokerError,
}

impl ApplicationFailure {
    /// Whether the failure should stop whoever depends on the application.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.error.is_fatal()
    }
}
