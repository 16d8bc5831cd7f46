//! # Authentication Application
//!
//! `app:authentication` serves `AuthenticationService`:
//!
//! - `SelectAccount` runs the host's account picker and replies with the
//!   chosen account name.
//! - `GetOAuth2Token` asks the [`TokenProvider`]. When the provider needs the
//!   user first, the call is suspended, the host runs the recovery action, and
//!   on approval the original call is issued again with the same parameters.
//!   A second recoverable failure is returned to the client.
//! - `ClearOAuth2Token` forwards to the provider. Errors are ignored.
//!
//! A denied action answers with `User denied the request.`.

mod protocol;
mod provider;
mod service;

pub use protocol::{AuthReply, AuthRequest, AUTHENTICATION_INTERFACE};
pub use provider::{TokenError, TokenProvider};
pub use service::EMPTY_SCOPES;

use sb_01_service_directory::ServiceDirectory;
use sb_02_connection_broker::{Application, Shell};
use sb_04_pending_requests::{result_channel, ExternalActionHost, ResultSender};
use service::{serve_session, AuthenticationLoop};
use shared_types::BrokerError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Host action that lets the user pick an account. Granted data is the
/// account name as UTF-8.
pub const ACCOUNT_PICKER_ACTION: &str = "account-picker";

/// Host action that asks the user to approve a token request. The payload is
/// the bincode `(account, scope)` pair.
pub const CONSENT_ACTION: &str = "recover-authorization";

/// Builds the external action host for one application instance, given the
/// sender its results must be posted to.
pub type ActionHostFactory = Arc<dyn Fn(ResultSender) -> Arc<dyn ExternalActionHost> + Send + Sync>;

/// The authentication application.
pub struct AuthenticationApp {
    provider: Arc<dyn TokenProvider>,
    hosts: ActionHostFactory,
    task: Option<JoinHandle<()>>,
}

impl AuthenticationApp {
    /// Application backed by `provider`, running external actions on the host
    /// built by `hosts`.
    pub fn new(provider: Arc<dyn TokenProvider>, hosts: ActionHostFactory) -> Self {
        Self {
            provider,
            hosts,
            task: None,
        }
    }
}

impl Application for AuthenticationApp {
    fn initialize(
        &mut self,
        shell: &Shell,
        _args: &[String],
        directory: &mut ServiceDirectory,
    ) -> Result<(), BrokerError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let next_session = Arc::new(AtomicU64::new(1));
        directory.register(AUTHENTICATION_INTERFACE, move |endpoint, ctx| {
            let session = next_session.fetch_add(1, Ordering::Relaxed);
            tokio::spawn(serve_session(
                session,
                endpoint,
                ctx.requestor.clone(),
                events_tx.clone(),
            ));
        })?;

        let (results, inbox) = result_channel();
        let host = (self.hosts)(results);
        let service = AuthenticationLoop::new(Arc::clone(&self.provider), host);
        self.task = Some(tokio::spawn(service.run(events_rx, inbox)));

        debug!(application = %shell.application_name(), "Authentication service ready");
        Ok(())
    }

    fn on_shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for AuthenticationApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationApp")
            .field("running", &self.task.is_some())
            .finish()
    }
}
