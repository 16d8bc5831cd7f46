//! `app:network_service`: stand-in for the platform network service.
//!
//! Each request message is answered with its payload behind a fixed prefix.
//! The prefix is the first startup argument, or `fetched:`.

use sb_01_service_directory::ServiceDirectory;
use sb_02_connection_broker::{Application, Shell};
use shared_channel::{ChannelEnd, Message};
use shared_types::BrokerError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Interface served by [`NetworkApp`] and by the authenticating proxy.
pub const NETWORK_INTERFACE: &str = "NetworkService";

/// Reply prefix when no startup argument overrides it.
pub const DEFAULT_REPLY_PREFIX: &str = "fetched:";

/// Serves `NetworkService`.
#[derive(Debug, Default)]
pub struct NetworkApp {
    served: Arc<AtomicU64>,
}

impl Application for NetworkApp {
    fn initialize(
        &mut self,
        shell: &Shell,
        args: &[String],
        directory: &mut ServiceDirectory,
    ) -> Result<(), BrokerError> {
        let prefix: Arc<[u8]> = args
            .first()
            .map_or(DEFAULT_REPLY_PREFIX, String::as_str)
            .as_bytes()
            .into();
        debug!(
            application = %shell.application_name(),
            prefix = %String::from_utf8_lossy(&prefix),
            "Network service ready"
        );

        let served = Arc::clone(&self.served);
        directory.register(NETWORK_INTERFACE, move |endpoint, _ctx| {
            tokio::spawn(fetch_loop(
                endpoint,
                Arc::clone(&prefix),
                Arc::clone(&served),
            ));
        })?;
        Ok(())
    }

    fn on_shutdown(&mut self) {
        info!(served = self.served.load(Ordering::Relaxed), "Network service stopped");
    }
}

async fn fetch_loop(mut endpoint: ChannelEnd, prefix: Arc<[u8]>, served: Arc<AtomicU64>) {
    while let Some(request) = endpoint.read().await {
        let mut body = Vec::with_capacity(prefix.len() + request.len());
        body.extend_from_slice(&prefix);
        body.extend_from_slice(&request.payload);
        if endpoint.write(Message::new(body)).is_err() {
            break;
        }
        served.fetch_add(1, Ordering::Relaxed);
    }
}
