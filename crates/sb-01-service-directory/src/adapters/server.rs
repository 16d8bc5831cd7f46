//! # Directory Server
//!
//! Runs on the owning application's loop, answering lookups that arrive over
//! one directory channel until the peer goes away.

use crate::domain::{ConnectionContext, DirectoryError, ServiceDirectory};
use shared_channel::{ChannelEnd, Message};
use shared_types::{DirectoryRequest, ProtocolError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Serve lookups arriving on `endpoint` until the peer disconnects.
///
/// Each message must be a `DirectoryRequest` carrying exactly one endpoint.
/// A malformed request closes the directory channel (and drops whatever
/// endpoints it carried). Returns the number of requests handled.
pub async fn serve(
    directory: Arc<ServiceDirectory>,
    mut endpoint: ChannelEnd,
    ctx: ConnectionContext,
) -> usize {
    let mut handled = 0usize;
    debug!(
        target_app = %ctx.target,
        requestor = %ctx.requestor,
        endpoint = %endpoint.id(),
        "Directory channel open"
    );

    while let Some(message) = endpoint.read().await {
        handled += 1;
        match handle_request(&directory, message, &ctx) {
            Ok(()) | Err(DirectoryError::NoSuchService(_)) => {}
            Err(err) => {
                warn!(
                    target_app = %ctx.target,
                    requestor = %ctx.requestor,
                    error = %err,
                    "Closing directory channel"
                );
                endpoint.close();
                break;
            }
        }
    }

    debug!(
        target_app = %ctx.target,
        requestor = %ctx.requestor,
        handled,
        "Directory channel closed"
    );
    handled
}

/// Decode one request and resolve it against `directory`.
pub(crate) fn handle_request(
    directory: &ServiceDirectory,
    mut message: Message,
    ctx: &ConnectionContext,
) -> Result<(), DirectoryError> {
    let request = DirectoryRequest::decode(&message.payload)?;
    let mut endpoints = message.take_endpoints();
    if endpoints.len() != 1 {
        return Err(ProtocolError::EndpointCount {
            expected: 1,
            actual: endpoints.len(),
        }
        .into());
    }
    let bound = endpoints.remove(0);
    directory.resolve(request.interface(), bound, ctx)
}
