//! # Channel Endpoints
//!
//! Each `ChannelEnd` owns the sending half towards its peer and the receiving
//! half from its peer. Both halves are released together on close.

use crate::message::Message;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::trace;

static NEXT_ENDPOINT_ID: AtomicU64 = AtomicU64::new(1);

/// Errors from channel operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The peer closed its end.
    #[error("Peer disconnected")]
    Disconnected,

    /// This end was already closed.
    #[error("Endpoint closed")]
    Closed,
}

impl From<ChannelError> for shared_types::BrokerError {
    fn from(_: ChannelError) -> Self {
        shared_types::BrokerError::Disconnected
    }
}

/// Process-unique identifier of one channel end, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(u64);

impl EndpointId {
    fn next() -> Self {
        Self(NEXT_ENDPOINT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep-{}", self.0)
    }
}

/// Create a connected pair of channel ends.
#[must_use]
pub fn channel() -> (ChannelEnd, ChannelEnd) {
    let (to_b, from_a) = mpsc::unbounded_channel();
    let (to_a, from_b) = mpsc::unbounded_channel();
    let (a_state, a_watch) = watch::channel(false);
    let (b_state, b_watch) = watch::channel(false);
    let a_id = EndpointId::next();
    let b_id = EndpointId::next();

    trace!(a = %a_id, b = %b_id, "Channel created");

    let a = ChannelEnd {
        id: a_id,
        peer: b_id,
        sender: Some(to_b),
        receiver: from_b,
        closed: false,
        state: a_state,
        peer_state: b_watch,
    };
    let b = ChannelEnd {
        id: b_id,
        peer: a_id,
        sender: Some(to_a),
        receiver: from_a,
        closed: false,
        state: b_state,
        peer_state: a_watch,
    };
    (a, b)
}

/// One end of a bidirectional message channel.
///
/// Exclusively owned; moving it (directly or inside a `Message`) transfers
/// ownership. Dropping it closes it.
pub struct ChannelEnd {
    id: EndpointId,
    peer: EndpointId,
    sender: Option<mpsc::UnboundedSender<Message>>,
    receiver: mpsc::UnboundedReceiver<Message>,
    closed: bool,
    state: watch::Sender<bool>,
    peer_state: watch::Receiver<bool>,
}

impl ChannelEnd {
    /// This end's identifier.
    #[must_use]
    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// The peer end's identifier.
    #[must_use]
    pub fn peer_id(&self) -> EndpointId {
        self.peer
    }

    /// Write a message to the peer.
    ///
    /// # Errors
    ///
    /// - `ChannelError::Closed` - this end was closed
    /// - `ChannelError::Disconnected` - the peer is gone; the message (and any
    ///   endpoints it carried) is dropped
    pub fn write(&self, message: Message) -> Result<(), ChannelError> {
        let sender = self.sender.as_ref().ok_or(ChannelError::Closed)?;
        sender
            .send(message)
            .map_err(|_| ChannelError::Disconnected)
    }

    /// Read the next message without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - a message was available
    /// - `Ok(None)` - nothing to read yet (would block)
    /// - `Err(ChannelError::Disconnected)` - peer closed and nothing is left
    /// - `Err(ChannelError::Closed)` - this end was closed
    pub fn try_read(&mut self) -> Result<Option<Message>, ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the peer has closed and everything it wrote has
    /// been read, or if this end is closed.
    pub async fn read(&mut self) -> Option<Message> {
        if self.closed {
            return None;
        }
        self.receiver.recv().await
    }

    /// Park until a message is readable, optionally bounded by `timeout`.
    ///
    /// A timeout is reported as `Ok(None)`, the same as would-block, never as
    /// an error.
    pub async fn wait_readable(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Option<Message>, ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.receiver.recv()).await {
                Ok(Some(message)) => Ok(Some(message)),
                Ok(None) => Err(ChannelError::Disconnected),
                Err(_) => Ok(None),
            },
            None => self
                .receiver
                .recv()
                .await
                .map(Some)
                .ok_or(ChannelError::Disconnected),
        }
    }

    /// Close this end. Idempotent.
    ///
    /// Buffered inbound messages are dropped along with any endpoints they
    /// carry, so nothing transferred to a closed end leaks.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.sender = None;
        self.state.send_replace(true);
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
        trace!(endpoint = %self.id, peer = %self.peer, "Channel end closed");
    }

    /// Whether this end has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the peer can no longer receive writes from this end.
    #[must_use]
    pub fn is_peer_closed(&self) -> bool {
        self.sender.as_ref().map_or(true, |s| s.is_closed())
    }

    /// Wait until the peer closes its end.
    pub async fn peer_closed(&self) {
        if let Some(sender) = &self.sender {
            sender.closed().await;
        }
    }

    /// A watch that fires once either end of this channel is closed or
    /// dropped. It does not keep the channel open.
    #[must_use]
    pub fn close_watch(&self) -> CloseWatch {
        CloseWatch {
            own: self.state.subscribe(),
            peer: self.peer_state.clone(),
        }
    }
}

/// Observes a channel's lifetime from outside its owners.
#[derive(Debug, Clone)]
pub struct CloseWatch {
    own: watch::Receiver<bool>,
    peer: watch::Receiver<bool>,
}

impl CloseWatch {
    /// Whether either end has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        Self::ended(&self.own) || Self::ended(&self.peer)
    }

    /// Wait until either end closes.
    pub async fn closed(&mut self) {
        tokio::select! {
            _ = self.own.wait_for(|closed| *closed) => {}
            _ = self.peer.wait_for(|closed| *closed) => {}
        }
    }

    // A dropped end never sends `true`; its sender going away counts.
    fn ended(state: &watch::Receiver<bool>) -> bool {
        *state.borrow() || state.has_changed().is_err()
    }
}

impl fmt::Debug for ChannelEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelEnd")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.closed)
            .finish()
    }
}
