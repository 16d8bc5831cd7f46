//! Hand-off of host results onto the owning loop.

use crate::ports::ExternalOutcome;
use crate::token::Token;
use tokio::sync::mpsc;
use tracing::debug;

/// One result reported by the host runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalResult {
    /// Token the action was started with.
    pub token: Token,
    /// What happened.
    pub outcome: ExternalOutcome,
}

/// Create a connected sender/inbox pair.
#[must_use]
pub fn result_channel() -> (ResultSender, ResultInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ResultSender { tx }, ResultInbox { rx })
}

/// Thread-safe entry point for host callbacks. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ResultSender {
    tx: mpsc::UnboundedSender<ExternalResult>,
}

impl ResultSender {
    /// Post a result for the owning loop to resolve.
    ///
    /// Returns `false` if the owning loop is gone.
    pub fn deliver_external_action_result(&self, token: Token, outcome: ExternalOutcome) -> bool {
        let delivered = self.tx.send(ExternalResult { token, outcome }).is_ok();
        if !delivered {
            debug!(token = %token, "Result dropped, owner loop gone");
        }
        delivered
    }
}

/// Results waiting to be resolved on the owning loop.
#[derive(Debug)]
pub struct ResultInbox {
    rx: mpsc::UnboundedReceiver<ExternalResult>,
}

impl ResultInbox {
    /// Wait for the next result. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ExternalResult> {
        self.rx.recv().await
    }

    /// Take the next result without waiting.
    pub fn try_recv(&mut self) -> Option<ExternalResult> {
        self.rx.try_recv().ok()
    }
}
