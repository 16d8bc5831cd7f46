//! Outbound Ports (Driven Ports)
//!
//! The host runtime creates application instances; the broker drives their
//! lifecycle through the `Application` trait.

use crate::error::HostError;
use crate::service::Shell;
use async_trait::async_trait;
use sb_01_service_directory::{ConnectionContext, ServiceDirectory};
use shared_types::{ApplicationName, BrokerError};

/// Platform that knows how to produce application instances.
#[async_trait]
pub trait HostRuntime: Send + Sync {
    /// Create a fresh, uninitialized instance of `name`.
    ///
    /// `name` is the full name as requested, including any query suffix.
    async fn create_application_instance(
        &self,
        name: &ApplicationName,
    ) -> Result<Box<dyn Application>, HostError>;
}

/// A unit of isolated logic reachable by name.
///
/// All calls happen on the instance's own loop, one at a time.
pub trait Application: Send {
    /// Register services and keep whatever the application needs from `shell`.
    ///
    /// Returning an error aborts the start: queued connections are dropped and
    /// the instance is discarded.
    fn initialize(
        &mut self,
        shell: &Shell,
        args: &[String],
        directory: &mut ServiceDirectory,
    ) -> Result<(), BrokerError>;

    /// Called before each incoming connection is served.
    fn on_connection(&mut self, _ctx: &ConnectionContext) {}

    /// Called once when the instance stops.
    fn on_shutdown(&mut self) {}
}
