//! Cross-crate integration scenarios.

pub mod authorization;
pub mod flows;
pub mod interposition;

use sb_02_connection_broker::{Application, BrokerConfig, ConnectionBroker, LoaderRegistry};
use shared_channel::ChannelEnd;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for any single wait in these scenarios.
pub const WAIT: Duration = Duration::from_secs(5);

/// A broker over `registry` with default configuration.
pub fn broker_with(registry: LoaderRegistry) -> Arc<ConnectionBroker> {
    ConnectionBroker::new(Arc::new(registry), BrokerConfig::default())
}

/// Register `make` as the loader for exactly `name`.
pub fn register<A, F>(registry: &LoaderRegistry, name: &str, make: F)
where
    A: Application + 'static,
    F: Fn() -> A + Send + Sync + 'static,
{
    registry.set_loader_for_name(name, move |_| Ok(Box::new(make()) as Box<dyn Application>));
}

/// Read one message payload, failing the test on timeout or disconnect.
pub async fn read_payload(end: &mut ChannelEnd) -> Vec<u8> {
    let message = tokio::time::timeout(WAIT, end.read())
        .await
        .expect("timed out waiting for a message")
        .expect("channel closed");
    message.payload.to_vec()
}

/// Whether `end` observes a disconnect within [`WAIT`].
pub async fn sees_disconnect(end: &mut ChannelEnd) -> bool {
    matches!(tokio::time::timeout(WAIT, end.read()).await, Ok(None))
}
