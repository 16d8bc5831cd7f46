//! Broker configuration.

use super::mappings::NameMappings;
use sb_01_service_directory::DuplicatePolicy;
use shared_types::ApplicationName;
use std::collections::HashMap;

/// Settings applied to every application the broker starts.
#[derive(Debug, Clone, Default)]
pub struct BrokerConfig {
    /// Policy for duplicate registrations in each application's directory.
    pub duplicate_policy: DuplicatePolicy,

    /// Startup arguments keyed by application name (query suffix stripped).
    pub args: HashMap<String, Vec<String>>,

    /// Aliases applied to every requested name before anything else.
    pub mappings: NameMappings,
}

impl BrokerConfig {
    /// Arguments for `name`, looked up by its instance key.
    #[must_use]
    pub fn args_for(&self, name: &ApplicationName) -> Vec<String> {
        self.args
            .get(name.instance_key().as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Set the startup arguments for one application.
    #[must_use]
    pub fn with_args(mut self, name: &str, args: Vec<String>) -> Self {
        self.args.insert(name.to_string(), args);
        self
    }

    /// Alias `from` to `to`.
    #[must_use]
    pub fn with_mapping(mut self, from: &str, to: &str) -> Self {
        self.mappings.insert(from, to);
        self
    }
}
