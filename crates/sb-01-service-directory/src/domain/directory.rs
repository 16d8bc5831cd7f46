//! # Service Directory
//!
//! Interface name → factory table owned by one application. Populated during
//! application initialization and read-only once the application is serving.

use super::context::ConnectionContext;
use super::errors::DirectoryError;
use broker_telemetry::{metric_inc, SERVICE_LOOKUPS};
use shared_channel::ChannelEnd;
use shared_types::InterfaceName;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Binds a fresh service instance to the given endpoint.
///
/// Called once per successful lookup. The factory owns the endpoint from the
/// moment it is invoked, typically by spawning a task that serves it.
pub type ServiceFactory = Arc<dyn Fn(ChannelEnd, &ConnectionContext) + Send + Sync>;

/// What `register` does when the interface already has a factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the first registration and return `AlreadyRegistered`.
    #[default]
    Reject,
    /// Replace the existing factory.
    Overwrite,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!("unknown duplicate policy: {other}")),
        }
    }
}

/// Per-application mapping from interface name to service factory.
pub struct ServiceDirectory {
    policy: DuplicatePolicy,
    factories: HashMap<InterfaceName, ServiceFactory>,
}

impl ServiceDirectory {
    /// Create an empty directory.
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            factories: HashMap::new(),
        }
    }

    /// The duplicate registration policy in force.
    #[must_use]
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Register a factory closure under `name`.
    ///
    /// # Errors
    ///
    /// `DirectoryError::AlreadyRegistered` if `name` is taken and the policy
    /// is `Reject`. The existing factory is left in place.
    pub fn register<F>(
        &mut self,
        name: impl Into<InterfaceName>,
        factory: F,
    ) -> Result<(), DirectoryError>
    where
        F: Fn(ChannelEnd, &ConnectionContext) + Send + Sync + 'static,
    {
        self.register_factory(name.into(), Arc::new(factory))
    }

    /// Register an already shared factory under `name`.
    ///
    /// # Errors
    ///
    /// `DirectoryError::AlreadyRegistered` if `name` is taken and the policy
    /// is `Reject`. The existing factory is left in place.
    pub fn register_factory(
        &mut self,
        name: InterfaceName,
        factory: ServiceFactory,
    ) -> Result<(), DirectoryError> {
        if self.factories.contains_key(&name) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    warn!(interface = %name, "Rejected duplicate service registration");
                    return Err(DirectoryError::AlreadyRegistered(name));
                }
                DuplicatePolicy::Overwrite => {
                    warn!(interface = %name, "Overwriting service registration");
                }
            }
        }
        debug!(interface = %name, "Service registered");
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Bind `endpoint` to a new instance of the service named `name`.
    ///
    /// On a miss the endpoint is closed before returning, so the peer sees a
    /// disconnect instead of waiting forever.
    ///
    /// # Errors
    ///
    /// `DirectoryError::NoSuchService` when nothing is registered under `name`.
    pub fn resolve(
        &self,
        name: &InterfaceName,
        mut endpoint: ChannelEnd,
        ctx: &ConnectionContext,
    ) -> Result<(), DirectoryError> {
        match self.factories.get(name) {
            Some(factory) => {
                metric_inc!(SERVICE_LOOKUPS, &["hit"]);
                debug!(
                    interface = %name,
                    requestor = %ctx.requestor,
                    target = %ctx.target,
                    endpoint = %endpoint.id(),
                    "Binding service"
                );
                factory(endpoint, ctx);
                Ok(())
            }
            None => {
                metric_inc!(SERVICE_LOOKUPS, &["miss"]);
                debug!(
                    interface = %name,
                    requestor = %ctx.requestor,
                    target = %ctx.target,
                    "No such service, closing endpoint"
                );
                endpoint.close();
                Err(DirectoryError::NoSuchService(name.clone()))
            }
        }
    }

    /// Whether a factory is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &InterfaceName) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered interface names, sorted.
    #[must_use]
    pub fn interfaces(&self) -> Vec<InterfaceName> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered interfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for ServiceDirectory {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl fmt::Debug for ServiceDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDirectory")
            .field("policy", &self.policy)
            .field("interfaces", &self.interfaces())
            .finish()
    }
}
