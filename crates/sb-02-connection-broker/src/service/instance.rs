//! # Instance Loop
//!
//! One task per running application. It creates and initializes the
//! application, then takes connection requests off its inbox in order and
//! spawns a directory server for each.
//!
//! A connection's forward and reverse channels share one lifetime: the
//! server task closes the reverse directory when the forward channel ends,
//! and stops serving when the reverse channel closes.

use super::broker::ConnectionBroker;
use super::shell::Shell;
use crate::domain::{ApplicationFailure, PendingConnection};
use crate::ports::{Application, HostRuntime};
use broker_telemetry::{APPLICATIONS_RUNNING, CONNECTIONS_FAILED};
use sb_01_service_directory::{
    serve, ConnectionContext, DuplicatePolicy, RemoteDirectory, ServiceDirectory,
};
use shared_channel::{ChannelEnd, CloseWatch};
use shared_types::{ApplicationName, BrokerError};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Work item delivered to an instance's inbox.
#[derive(Debug)]
pub(crate) enum InstanceCommand {
    Connect(PendingConnection),
    Shutdown,
}

/// Everything an instance task needs to start its application.
pub(crate) struct InstanceLaunch {
    pub broker: Weak<ConnectionBroker>,
    pub host: Arc<dyn HostRuntime>,
    pub key: ApplicationName,
    pub launch_name: ApplicationName,
    pub generation: u64,
    pub policy: DuplicatePolicy,
    pub args: Vec<String>,
}

pub(crate) async fn run(launch: InstanceLaunch, mut inbox: mpsc::UnboundedReceiver<InstanceCommand>) {
    let InstanceLaunch {
        broker,
        host,
        key,
        launch_name,
        generation,
        policy,
        args,
    } = launch;

    info!(application = %key, "Starting application");

    let mut app = match host.create_application_instance(&launch_name).await {
        Ok(app) => app,
        Err(err) => {
            abort(&broker, &key, generation, &mut inbox, err.into());
            return;
        }
    };

    let shell = Shell::new(broker.clone(), key.clone());
    let mut directory = ServiceDirectory::new(policy);
    if let Err(err) = app.initialize(&shell, &args, &mut directory) {
        abort(&broker, &key, generation, &mut inbox, err);
        return;
    }
    let directory = Arc::new(directory);

    APPLICATIONS_RUNNING.inc();
    info!(
        application = %key,
        services = ?directory.interfaces(),
        "Application running"
    );

    let mut sessions: JoinSet<usize> = JoinSet::new();
    loop {
        tokio::select! {
            command = inbox.recv() => match command {
                Some(InstanceCommand::Connect(pending)) => {
                    accept(app.as_mut(), &directory, pending, &mut sessions);
                }
                Some(InstanceCommand::Shutdown) | None => break,
            },
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
        }
    }

    sessions.abort_all();
    app.on_shutdown();
    APPLICATIONS_RUNNING.dec();
    info!(application = %key, "Application stopped");
}

fn accept(
    app: &mut dyn Application,
    directory: &Arc<ServiceDirectory>,
    pending: PendingConnection,
    sessions: &mut JoinSet<usize>,
) {
    let PendingConnection {
        requestor,
        target,
        forward,
        reverse,
    } = pending;

    let reverse_watch = reverse.as_ref().map(ChannelEnd::close_watch);
    let exposed = reverse.map_or_else(RemoteDirectory::inert, RemoteDirectory::new);
    debug!(
        application = %target,
        requestor = %requestor,
        endpoint = %forward.id(),
        exposed = !exposed.is_inert(),
        "Accepting connection"
    );

    let ctx = ConnectionContext {
        requestor,
        target,
        exposed: Arc::new(exposed),
    };
    app.on_connection(&ctx);
    sessions.spawn(serve_linked(Arc::clone(directory), forward, reverse_watch, ctx));
}

/// Closes the exposed directory however the server task ends, abort included.
struct CloseOnDrop(Arc<RemoteDirectory>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Serve one connection's directory until either of its channels closes.
async fn serve_linked(
    directory: Arc<ServiceDirectory>,
    forward: ChannelEnd,
    reverse: Option<CloseWatch>,
    ctx: ConnectionContext,
) -> usize {
    let _exposed = CloseOnDrop(Arc::clone(&ctx.exposed));
    let Some(mut reverse) = reverse else {
        return serve(directory, forward, ctx).await;
    };

    let endpoint = forward.id();
    tokio::select! {
        handled = serve(directory, forward, ctx) => handled,
        () = reverse.closed() => {
            debug!(endpoint = %endpoint, "Reverse channel closed, dropping connection");
            0
        }
    }
}

/// Give up on an instance that never started. Every queued request is
/// dropped, which closes the channels it carries.
fn abort(
    broker: &Weak<ConnectionBroker>,
    key: &ApplicationName,
    generation: u64,
    inbox: &mut mpsc::UnboundedReceiver<InstanceCommand>,
    err: BrokerError,
) {
    if err.is_fatal() {
        error!(application = %key, error = %err, "Application failed to start");
    } else {
        debug!(application = %key, error = %err, "Application unavailable");
    }

    let broker = broker.upgrade();
    if let Some(broker) = &broker {
        broker.remove_slot(key, generation);
    }
    inbox.close();

    let mut dropped = 0u64;
    while let Ok(command) = inbox.try_recv() {
        if let InstanceCommand::Connect(pending) = command {
            debug!(
                application = %key,
                requestor = %pending.requestor,
                "Dropping queued connection"
            );
            dropped += 1;
        }
    }
    CONNECTIONS_FAILED.inc_by(dropped as f64);

    if let Some(broker) = broker {
        broker.report_failure(ApplicationFailure {
            name: key.clone(),
            error: err,
        });
    }
}
