//! # Connection Broker
//!
//! Owns the application name → instance table. This table is the only state
//! the broker shares between callers, and every access is one short critical
//! section.

use super::instance::{self, InstanceCommand, InstanceLaunch};
use super::shell::Shell;
use crate::domain::{ApplicationFailure, BrokerConfig, Connection, PendingConnection};
use crate::ports::HostRuntime;
use broker_telemetry::{metric_inc, CONNECTIONS_REQUESTED};
use parking_lot::Mutex;
use shared_channel::channel;
use shared_types::{ApplicationName, RequestorIdentity};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Buffered start failures per subscriber before it starts lagging.
const FAILURE_CAPACITY: usize = 64;

/// A running (or starting) application instance.
struct InstanceSlot {
    generation: u64,
    inbox: mpsc::UnboundedSender<InstanceCommand>,
    task: JoinHandle<()>,
}

/// Resolves application names to running instances and wires connections.
pub struct ConnectionBroker {
    host: Arc<dyn HostRuntime>,
    config: BrokerConfig,
    instances: Mutex<HashMap<ApplicationName, InstanceSlot>>,
    next_generation: AtomicU64,
    failures: broadcast::Sender<ApplicationFailure>,
    this: Weak<ConnectionBroker>,
}

impl ConnectionBroker {
    /// Create a broker backed by `host`.
    pub fn new(host: Arc<dyn HostRuntime>, config: BrokerConfig) -> Arc<Self> {
        let (failures, _) = broadcast::channel(FAILURE_CAPACITY);
        Arc::new_cyclic(|this| Self {
            host,
            config,
            instances: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            failures,
            this: this.clone(),
        })
    }

    /// The configuration applied to started applications.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// `name` after name mappings. Instances, loaders and startup arguments
    /// are all looked up under this name.
    #[must_use]
    pub fn resolve(&self, name: &ApplicationName) -> ApplicationName {
        self.config.mappings.apply(name)
    }

    /// Subscribe to applications that fail to start. Only failures after
    /// this call are delivered.
    #[must_use]
    pub fn subscribe_failures(&self) -> broadcast::Receiver<ApplicationFailure> {
        self.failures.subscribe()
    }

    pub(crate) fn report_failure(&self, failure: ApplicationFailure) {
        // Nobody listening is fine.
        let _ = self.failures.send(failure);
    }

    /// Connect `requestor` to the service directory of `target`.
    ///
    /// Returns immediately. The target is started on first use; if it cannot
    /// be started the returned channels are closed. When `exposes_services`
    /// is set, `reverse` carries the target's lookups into the requester's
    /// directory and the requester is expected to serve it. The connection
    /// lives until either channel closes; closing one closes the other.
    ///
    /// # Panics
    ///
    /// Starting a new instance spawns a task, so this must be called from
    /// within a Tokio runtime.
    pub fn connect(
        &self,
        target: &ApplicationName,
        requestor: RequestorIdentity,
        exposes_services: bool,
    ) -> Connection {
        metric_inc!(CONNECTIONS_REQUESTED);

        let target = self.resolve(target);
        let (forward, target_forward) = channel();
        let (reverse, target_reverse) = if exposes_services {
            let (requester_end, target_end) = channel();
            (Some(requester_end), Some(target_end))
        } else {
            (None, None)
        };

        debug!(
            target_app = %target,
            requestor = %requestor,
            exposes_services,
            endpoint = %forward.id(),
            "Connection requested"
        );

        self.enqueue(PendingConnection {
            requestor,
            target,
            forward: target_forward,
            reverse: target_reverse,
        });

        Connection { forward, reverse }
    }

    /// A shell acting as `identity`, for requesters that are not themselves
    /// started by this broker.
    #[must_use]
    pub fn shell(&self, identity: ApplicationName) -> Shell {
        Shell::new(self.this.clone(), identity)
    }

    /// Queue the request on the target's inbox, creating the instance if
    /// needed. Lookup, creation and enqueue share one critical section so
    /// requests reach each instance in issuance order.
    fn enqueue(&self, pending: PendingConnection) {
        let key = pending.target.instance_key();
        let launch_name = pending.target.clone();
        let mut command = InstanceCommand::Connect(pending);

        let mut instances = self.instances.lock();
        if let Some(slot) = instances.get(&key) {
            match slot.inbox.send(command) {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => command = returned,
            }
            warn!(application = %key, "Instance loop exited unexpectedly, restarting");
            instances.remove(&key);
        }

        let (inbox, receiver) = mpsc::unbounded_channel();
        if inbox.send(command).is_err() {
            return;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let launch = InstanceLaunch {
            broker: self.this.clone(),
            host: Arc::clone(&self.host),
            key: key.clone(),
            launch_name,
            generation,
            policy: self.config.duplicate_policy,
            args: self.config.args_for(&key),
        };
        let task = tokio::spawn(instance::run(launch, receiver));

        instances.insert(
            key,
            InstanceSlot {
                generation,
                inbox,
                task,
            },
        );
    }

    /// Forget the slot for `key` if it still belongs to `generation`.
    pub(crate) fn remove_slot(&self, key: &ApplicationName, generation: u64) -> bool {
        let mut instances = self.instances.lock();
        if instances.get(key).map(|slot| slot.generation) == Some(generation) {
            instances.remove(key);
            true
        } else {
            false
        }
    }

    /// Stop the instance serving `name`, if any.
    ///
    /// Requests queued before this call are still served; the application's
    /// `on_shutdown` runs before this returns.
    pub async fn shutdown_application(&self, name: &ApplicationName) -> bool {
        let key = self.resolve(name).instance_key();
        let slot = self.instances.lock().remove(&key);
        match slot {
            Some(slot) => {
                info!(application = %key, "Shutting down application");
                Self::stop(slot).await;
                true
            }
            None => false,
        }
    }

    /// Stop every instance. Returns how many were stopped.
    pub async fn shutdown_all(&self) -> usize {
        let slots: Vec<_> = self.instances.lock().drain().collect();
        let count = slots.len();
        info!(count, "Shutting down all applications");
        for (_, slot) in slots {
            Self::stop(slot).await;
        }
        count
    }

    async fn stop(slot: InstanceSlot) {
        let _ = slot.inbox.send(InstanceCommand::Shutdown);
        drop(slot.inbox);
        if let Err(err) = slot.task.await {
            warn!(error = %err, "Instance task did not finish cleanly");
        }
    }

    /// Names (query stripped) of instances that are running or starting.
    #[must_use]
    pub fn running_applications(&self) -> Vec<ApplicationName> {
        let mut names: Vec<_> = self.instances.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether an instance for `name` is running or starting.
    #[must_use]
    pub fn is_running(&self, name: &ApplicationName) -> bool {
        let key = self.resolve(name).instance_key();
        self.instances.lock().contains_key(&key)
    }
}

impl fmt::Debug for ConnectionBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBroker")
            .field("config", &self.config)
            .field("instances", &self.running_applications())
            .finish()
    }
}
