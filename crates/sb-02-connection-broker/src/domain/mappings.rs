//! # Name Mappings
//!
//! Aliases applied to a requested application name before it is resolved to
//! an instance, a loader, or startup arguments.
//!
//! ```text
//! app:browser ──▶ app:browser_dev ──▶ app:browser_local   (no further alias)
//! ```
//!
//! Matching is on the full name, query included.

use shared_types::ApplicationName;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Alias table. Lookups repeat until no alias applies, so mappings chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMappings {
    aliases: HashMap<ApplicationName, ApplicationName>,
}

impl NameMappings {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `from` to `to`, replacing any earlier alias for `from`.
    pub fn insert(&mut self, from: impl Into<ApplicationName>, to: impl Into<ApplicationName>) {
        self.aliases.insert(from.into(), to.into());
    }

    /// Builder form of [`NameMappings::insert`].
    #[must_use]
    pub fn with(mut self, from: impl Into<ApplicationName>, to: impl Into<ApplicationName>) -> Self {
        self.insert(from, to);
        self
    }

    /// Number of aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Whether there are no aliases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Follow aliases from `name` until none applies.
    ///
    /// A cycle stops at the name that closes it.
    #[must_use]
    pub fn apply(&self, name: &ApplicationName) -> ApplicationName {
        let mut current = name.clone();
        let mut visited = HashSet::new();
        while let Some(next) = self.aliases.get(&current) {
            if !visited.insert(current.clone()) {
                warn!(application = %name, at = %current, "Name mapping cycle");
                break;
            }
            current = next.clone();
        }
        current
    }
}
