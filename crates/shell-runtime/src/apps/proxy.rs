//! `app:authenticating_network_proxy`: interposes on `NetworkService`.
//!
//! ```text
//! client ══ NetworkService (this app) ── PipeForwarder ── NetworkService (upstream) ══
//! ```
//!
//! Every lookup opens its own upstream connection, so clients never share a
//! session. The upstream application is the first startup argument, or
//! `app:network_service`.

use crate::apps::network::NETWORK_INTERFACE;
use parking_lot::Mutex;
use sb_01_service_directory::ServiceDirectory;
use sb_02_connection_broker::{Application, Shell};
use sb_03_pipe_forwarder::{ForwarderConfig, ForwarderHandle, PipeForwarder};
use shared_types::{ApplicationName, BrokerError, InterfaceName};
use std::sync::Arc;
use tracing::debug;

/// Upstream used when no startup argument names one.
pub const DEFAULT_UPSTREAM: &str = "app:network_service";

/// Forwards each `NetworkService` session to the upstream network service.
#[derive(Debug)]
pub struct AuthenticatingProxyApp {
    forwarder: PipeForwarder,
    relays: Arc<Mutex<Vec<ForwarderHandle>>>,
}

impl AuthenticatingProxyApp {
    /// Proxy whose relays use `config`.
    pub fn new(config: ForwarderConfig) -> Self {
        Self {
            forwarder: PipeForwarder::new(config),
            relays: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Relays still running.
    #[must_use]
    pub fn active_relays(&self) -> usize {
        let mut relays = self.relays.lock();
        relays.retain(|relay| !relay.is_finished());
        relays.len()
    }
}

impl Application for AuthenticatingProxyApp {
    fn initialize(
        &mut self,
        shell: &Shell,
        args: &[String],
        directory: &mut ServiceDirectory,
    ) -> Result<(), BrokerError> {
        let upstream = ApplicationName::new(args.first().map_or(DEFAULT_UPSTREAM, String::as_str));
        if upstream.instance_key() == shell.application_name().instance_key() {
            return Err(BrokerError::Fatal(format!("{upstream} cannot proxy to itself")));
        }

        let shell = shell.clone();
        let forwarder = self.forwarder.clone();
        let relays = Arc::clone(&self.relays);
        directory.register(NETWORK_INTERFACE, move |client, ctx| {
            let service = shell.connect_to_service(&upstream, InterfaceName::new(NETWORK_INTERFACE));
            debug!(
                requestor = %ctx.requestor,
                upstream = %upstream,
                client = %client.id(),
                service = %service.id(),
                "Interposing on network session"
            );
            let relay = forwarder.forward(client, service);
            let mut relays = relays.lock();
            relays.retain(|relay| !relay.is_finished());
            relays.push(relay);
        })?;
        Ok(())
    }

    fn on_shutdown(&mut self) {
        let relays = std::mem::take(&mut *self.relays.lock());
        debug!(count = relays.len(), "Stopping relays");
        for relay in relays {
            relay.abort();
        }
    }
}
