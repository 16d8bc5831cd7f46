//! In-process host runtime backed by loader functions.

use crate::error::HostError;
use crate::ports::{Application, HostRuntime};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::ApplicationName;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Produces a fresh application instance for a name.
pub type ApplicationLoader =
    Arc<dyn Fn(&ApplicationName) -> Result<Box<dyn Application>, HostError> + Send + Sync>;

/// Loader table consulted in order: exact name (query stripped), scheme,
/// default.
#[derive(Default)]
pub struct LoaderRegistry {
    by_name: RwLock<HashMap<ApplicationName, ApplicationLoader>>,
    by_scheme: RwLock<HashMap<String, ApplicationLoader>>,
    default_loader: RwLock<Option<ApplicationLoader>>,
}

impl LoaderRegistry {
    /// Empty registry; every name is `NotFound`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `loader` for exactly `name`. Replaces any previous loader.
    pub fn set_loader_for_name<F>(&self, name: impl Into<ApplicationName>, loader: F)
    where
        F: Fn(&ApplicationName) -> Result<Box<dyn Application>, HostError> + Send + Sync + 'static,
    {
        let name = name.into().instance_key();
        debug!(application = %name, "Loader registered for name");
        self.by_name.write().insert(name, Arc::new(loader));
    }

    /// Use `loader` for every name with `scheme` that has no exact loader.
    pub fn set_loader_for_scheme<F>(&self, scheme: impl Into<String>, loader: F)
    where
        F: Fn(&ApplicationName) -> Result<Box<dyn Application>, HostError> + Send + Sync + 'static,
    {
        let scheme = scheme.into();
        debug!(scheme = %scheme, "Loader registered for scheme");
        self.by_scheme.write().insert(scheme, Arc::new(loader));
    }

    /// Use `loader` when nothing more specific matches.
    pub fn set_default_loader<F>(&self, loader: F)
    where
        F: Fn(&ApplicationName) -> Result<Box<dyn Application>, HostError> + Send + Sync + 'static,
    {
        *self.default_loader.write() = Some(Arc::new(loader));
    }

    /// The loader that would handle `name`, if any.
    #[must_use]
    pub fn loader_for(&self, name: &ApplicationName) -> Option<ApplicationLoader> {
        if let Some(loader) = self.by_name.read().get(&name.instance_key()) {
            return Some(Arc::clone(loader));
        }
        if let Some(loader) = name
            .scheme()
            .and_then(|scheme| self.by_scheme.read().get(scheme).cloned())
        {
            return Some(loader);
        }
        self.default_loader.read().clone()
    }

    /// Names with an exact loader, sorted.
    #[must_use]
    pub fn known_applications(&self) -> Vec<ApplicationName> {
        let mut names: Vec<_> = self.by_name.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl HostRuntime for LoaderRegistry {
    async fn create_application_instance(
        &self,
        name: &ApplicationName,
    ) -> Result<Box<dyn Application>, HostError> {
        let loader = self
            .loader_for(name)
            .ok_or_else(|| HostError::NotFound(name.clone()))?;
        loader(name)
    }
}
