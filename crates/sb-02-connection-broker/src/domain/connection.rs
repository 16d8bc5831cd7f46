//! Connection handles.

use shared_channel::ChannelEnd;
use shared_types::{ApplicationName, RequestorIdentity};

/// The requester's side of a brokered connection.
#[derive(Debug)]
pub struct Connection {
    /// Directory channel to the target; wrap it in a `RemoteDirectory`.
    pub forward: ChannelEnd,
    /// Present when the requester exposes services back to the target. The
    /// requester serves its own directory on this end.
    pub reverse: Option<ChannelEnd>,
}

/// A connection request waiting in a target's inbox.
#[derive(Debug)]
pub(crate) struct PendingConnection {
    pub requestor: RequestorIdentity,
    pub target: ApplicationName,
    pub forward: ChannelEnd,
    pub reverse: Option<ChannelEnd>,
}
