//! # Remote Directory
//!
//! Client half of a directory channel. Issues lookups by sending a fresh
//! channel end along with the interface name; the caller keeps the other end.

use crate::domain::DirectoryError;
use parking_lot::Mutex;
use shared_channel::{channel, ChannelEnd, Message};
use shared_types::{DirectoryRequest, InterfaceName};
use std::fmt;
use tracing::debug;

/// A peer's service directory, reached over a channel.
///
/// The inert variant has no channel and rejects every lookup by closing the
/// supplied endpoint immediately. Closing is possible through a shared
/// reference, so whoever tears a connection down can close the directory
/// even while services still hold it.
pub struct RemoteDirectory {
    channel: Mutex<Option<ChannelEnd>>,
}

impl RemoteDirectory {
    /// Wrap the client end of a directory channel.
    pub fn new(channel: ChannelEnd) -> Self {
        Self {
            channel: Mutex::new(Some(channel)),
        }
    }

    /// A directory that rejects every lookup.
    pub fn inert() -> Self {
        Self {
            channel: Mutex::new(None),
        }
    }

    /// Whether this is the inert directory.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.channel.lock().is_none()
    }

    /// Whether lookups can still reach the peer directory.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.channel
            .lock()
            .as_ref()
            .is_some_and(|c| !c.is_peer_closed())
    }

    /// Ask the peer to bind `interface` to `endpoint`.
    ///
    /// On any failure the endpoint is closed, so whoever holds its peer sees
    /// a disconnect.
    ///
    /// # Errors
    ///
    /// - `NoSuchService` - this directory is inert
    /// - `Disconnected` - the directory channel is gone
    pub fn bind(&self, interface: InterfaceName, endpoint: ChannelEnd) -> Result<(), DirectoryError> {
        let payload = DirectoryRequest::connect_to_service(interface.clone()).encode()?;
        let channel = self.channel.lock();
        let Some(directory) = channel.as_ref() else {
            drop(endpoint);
            return Err(DirectoryError::NoSuchService(interface));
        };

        directory
            .write(Message::with_endpoints(payload, vec![endpoint]))
            .map_err(|err| {
                debug!(interface = %interface, error = %err, "Directory lookup not delivered");
                DirectoryError::Disconnected
            })
    }

    /// Look up `interface` and return the local end of the new connection.
    ///
    /// Never fails outright: if the lookup cannot be delivered, or the peer has
    /// no such service, the returned end observes a disconnect.
    pub fn connect_to_service(&self, interface: InterfaceName) -> ChannelEnd {
        let (local, remote) = channel();
        if let Err(err) = self.bind(interface, remote) {
            debug!(error = %err, endpoint = %local.id(), "Service connection rejected");
        }
        local
    }

    /// Close the directory channel. Later lookups behave as on an inert directory.
    pub fn close(&self) {
        let taken = self.channel.lock().take();
        if let Some(mut channel) = taken {
            channel.close();
        }
    }
}

impl fmt::Debug for RemoteDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel.lock().as_ref() {
            Some(channel) => f
                .debug_struct("RemoteDirectory")
                .field("channel", &channel.id())
                .finish(),
            None => f.write_str("RemoteDirectory(inert)"),
        }
    }
}
