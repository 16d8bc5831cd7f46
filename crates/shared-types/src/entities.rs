//! # Core Entities
//!
//! Identifiers used for routing: which application, which service contract,
//! and who is asking.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an application, e.g. `app:echo` or `app:echo?x=1`.
///
/// Used both as a routing target and as a key for running instances. Two names
/// that differ only in their query suffix address the same running instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationName(String);

impl ApplicationName {
    /// Create a name from any string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The full name as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The scheme prefix (text before the first `:`), if any.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.0.split_once(':').map(|(scheme, _)| scheme)
    }

    /// The name with any `?query` suffix removed.
    ///
    /// Running instances are keyed by this value.
    #[must_use]
    pub fn instance_key(&self) -> ApplicationName {
        match self.0.split_once('?') {
            Some((base, _)) => Self(base.to_string()),
            None => self.clone(),
        }
    }

    /// Whether the name is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ApplicationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApplicationName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ApplicationName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque identifier of a service contract. Unique within one directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceName(String);

impl InterfaceName {
    /// Create an interface name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InterfaceName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for InterfaceName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identity of the party requesting a connection.
///
/// Applications connect as themselves; the empty identity is used for
/// requests originating outside any application (e.g. the shell's startup
/// connection).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestorIdentity(String);

impl RequestorIdentity {
    /// Create an identity.
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// The anonymous identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    /// Whether this is the anonymous identity.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<anonymous>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&ApplicationName> for RequestorIdentity {
    fn from(name: &ApplicationName) -> Self {
        Self(name.as_str().to_string())
    }
}

impl From<&str> for RequestorIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
