//! `app:echo`: one `Echo` service that writes every message straight back.

use sb_01_service_directory::ServiceDirectory;
use sb_02_connection_broker::{Application, Shell};
use shared_channel::ChannelEnd;
use shared_types::BrokerError;
use tracing::trace;

/// Interface served by [`EchoApp`].
pub const ECHO_INTERFACE: &str = "Echo";

/// Echoes payloads and transferred endpoints unchanged.
#[derive(Debug, Default)]
pub struct EchoApp;

impl Application for EchoApp {
    fn initialize(
        &mut self,
        _shell: &Shell,
        _args: &[String],
        directory: &mut ServiceDirectory,
    ) -> Result<(), BrokerError> {
        directory.register(ECHO_INTERFACE, |endpoint, _ctx| {
            tokio::spawn(echo(endpoint));
        })?;
        Ok(())
    }
}

async fn echo(mut endpoint: ChannelEnd) {
    let mut echoed = 0u64;
    while let Some(message) = endpoint.read().await {
        if endpoint.write(message).is_err() {
            break;
        }
        echoed += 1;
    }
    trace!(endpoint = %endpoint.id(), echoed, "Echo session ended");
}
