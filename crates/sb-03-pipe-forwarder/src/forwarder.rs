//! Relay loop and its task handle.

use broker_telemetry::{metric_inc, MESSAGES_FORWARDED};
use shared_channel::{ChannelEnd, ChannelError, Message};
use std::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Forwarder settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwarderConfig {
    /// Upper bound on a single wait for readability. `None` waits
    /// indefinitely. Expiry only restarts the wait.
    pub idle_wait: Option<Duration>,
}

/// One of the two spliced ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The first end passed to the forwarder.
    X,
    /// The second end passed to the forwarder.
    Y,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("x"),
            Self::Y => f.write_str("y"),
        }
    }
}

/// Summary of a finished relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardReport {
    /// Messages relayed from X to Y.
    pub x_to_y: u64,
    /// Messages relayed from Y to X.
    pub y_to_x: u64,
    /// The side whose disconnect (or failed write) ended the relay.
    pub terminated_by: Side,
}

/// Transparent full-duplex relay.
#[derive(Debug, Clone, Default)]
pub struct PipeForwarder {
    config: ForwarderConfig,
}

impl PipeForwarder {
    /// Create a forwarder.
    pub fn new(config: ForwarderConfig) -> Self {
        Self { config }
    }

    /// Relay between `x` and `y` on a new task.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn forward(&self, x: ChannelEnd, y: ChannelEnd) -> ForwarderHandle {
        let config = self.config;
        ForwarderHandle {
            task: tokio::spawn(relay(config, x, y)),
        }
    }

    /// Relay between `x` and `y` until either side ends.
    pub async fn run(&self, x: ChannelEnd, y: ChannelEnd) -> ForwardReport {
        relay(self.config, x, y).await
    }
}

/// Handle to a relay running on its own task.
#[derive(Debug)]
pub struct ForwarderHandle {
    task: JoinHandle<ForwardReport>,
}

impl ForwarderHandle {
    /// Wait for the relay to end. `None` if the task was aborted.
    pub async fn join(self) -> Option<ForwardReport> {
        self.task.await.ok()
    }

    /// Whether the relay has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop relaying. Both ends are dropped, which closes them.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// What happened to one read-then-write step.
enum Step {
    Relayed,
    Idle,
    Ended(Side),
}

fn pass(source: Side, read: Result<Option<Message>, ChannelError>, sink: &ChannelEnd) -> Step {
    let sink_side = match source {
        Side::X => Side::Y,
        Side::Y => Side::X,
    };
    match read {
        Ok(Some(message)) => match sink.write(message) {
            Ok(()) => Step::Relayed,
            Err(err) => {
                trace!(side = %sink_side, error = %err, "Write failed");
                Step::Ended(sink_side)
            }
        },
        Ok(None) => Step::Idle,
        Err(err) => {
            trace!(side = %source, error = %err, "Read ended");
            Step::Ended(source)
        }
    }
}

async fn relay(config: ForwarderConfig, mut x: ChannelEnd, mut y: ChannelEnd) -> ForwardReport {
    let (x_id, y_id) = (x.id(), y.id());
    debug!(x = %x_id, y = %y_id, "Forwarding started");

    let mut x_to_y = 0u64;
    let mut y_to_x = 0u64;

    let terminated_by = loop {
        let (direction, step) = tokio::select! {
            read = x.wait_readable(config.idle_wait) => (Side::X, pass(Side::X, read, &y)),
            read = y.wait_readable(config.idle_wait) => (Side::Y, pass(Side::Y, read, &x)),
        };
        match step {
            Step::Relayed => {
                metric_inc!(MESSAGES_FORWARDED);
                match direction {
                    Side::X => x_to_y += 1,
                    Side::Y => y_to_x += 1,
                }
            }
            Step::Idle => {}
            Step::Ended(side) => break side,
        }
    };

    x.close();
    y.close();

    debug!(
        x = %x_id,
        y = %y_id,
        x_to_y,
        y_to_x,
        terminated_by = %terminated_by,
        "Forwarding stopped"
    );

    ForwardReport {
        x_to_y,
        y_to_x,
        terminated_by,
    }
}
