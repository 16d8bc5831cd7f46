//! # Shell
//!
//! The handle an application gets at initialization for reaching other
//! applications. Holds only a weak reference to the broker; once the broker is
//! gone every connection attempt yields a disconnected channel.

use super::broker::ConnectionBroker;
use sb_01_service_directory::{serve, ConnectionContext, RemoteDirectory, ServiceDirectory};
use shared_channel::ChannelEnd;
use shared_types::{ApplicationName, InterfaceName, RequestorIdentity};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Connection handle owned by one application.
#[derive(Clone)]
pub struct Shell {
    broker: Weak<ConnectionBroker>,
    identity: ApplicationName,
}

impl Shell {
    pub(crate) fn new(broker: Weak<ConnectionBroker>, identity: ApplicationName) -> Self {
        Self { broker, identity }
    }

    /// A shell with no broker behind it. Every connection is disconnected.
    pub fn detached(identity: ApplicationName) -> Self {
        Self::new(Weak::new(), identity)
    }

    /// The application this shell belongs to.
    #[must_use]
    pub fn application_name(&self) -> &ApplicationName {
        &self.identity
    }

    /// Whether the broker is still alive.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.broker.strong_count() > 0
    }

    /// Connect to `target`'s service directory.
    ///
    /// When `exposed` is given, it is served to the target on this
    /// application's behalf for as long as the target keeps the reverse
    /// channel open.
    pub fn connect_to_application(
        &self,
        target: &ApplicationName,
        exposed: Option<Arc<ServiceDirectory>>,
    ) -> RemoteDirectory {
        let Some(broker) = self.broker.upgrade() else {
            debug!(
                application = %self.identity,
                target_app = %target,
                "Broker gone, connection refused"
            );
            return RemoteDirectory::inert();
        };

        let connection = broker.connect(
            target,
            RequestorIdentity::from(&self.identity),
            exposed.is_some(),
        );

        if let (Some(directory), Some(reverse)) = (exposed, connection.reverse) {
            let ctx = ConnectionContext::new(RequestorIdentity::from(target), self.identity.clone());
            tokio::spawn(serve(directory, reverse, ctx));
        }

        RemoteDirectory::new(connection.forward)
    }

    /// Connect to one interface of `target`.
    pub fn connect_to_service(&self, target: &ApplicationName, interface: InterfaceName) -> ChannelEnd {
        self.connect_to_application(target, None)
            .connect_to_service(interface)
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("identity", &self.identity)
            .field("attached", &self.is_attached())
            .finish()
    }
}
