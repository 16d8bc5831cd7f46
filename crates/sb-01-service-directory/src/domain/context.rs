//! Connection context passed to service factories.

use crate::adapters::RemoteDirectory;
use shared_types::{ApplicationName, RequestorIdentity};
use std::sync::Arc;

/// Who a lookup is being served for.
///
/// `exposed` is the requester's own directory as seen from the target. It is
/// inert when the requester exposes nothing.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Identity of the connecting application.
    pub requestor: RequestorIdentity,
    /// The application whose directory is being served.
    pub target: ApplicationName,
    /// Services the requester exposes back to the target.
    pub exposed: Arc<RemoteDirectory>,
}

impl ConnectionContext {
    /// Context with no reverse exposure.
    pub fn new(requestor: RequestorIdentity, target: ApplicationName) -> Self {
        Self {
            requestor,
            target,
            exposed: Arc::new(RemoteDirectory::inert()),
        }
    }

    /// Attach the requester's exposed directory.
    #[must_use]
    pub fn with_exposed(mut self, exposed: RemoteDirectory) -> Self {
        self.exposed = Arc::new(exposed);
        self
    }
}
