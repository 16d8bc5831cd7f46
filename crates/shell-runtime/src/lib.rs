//! # Shell Runtime Library
//!
//! Hosts the broker in-process with a fixed set of bundled applications.
//! The main entry point is the `main.rs` binary; the library is exposed for
//! the scenario tests.
//!
//! ## Structure
//!
//! - `config.rs` - `ShellConfig` loaded from the environment
//! - `error.rs`  - `ShellError` returned by `ShellRuntime::run`
//! - `apps/`     - bundled applications (echo, network, authentication, proxy)
//! - `host/`     - loader registry wiring, local account store, local action host

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod apps;
pub mod config;
pub mod error;
pub mod host;

pub use config::{ConfigError, ShellConfig};
pub use error::ShellError;

use host::{bundled_registry, LocalAccounts};
use parking_lot::Mutex;
use sb_01_service_directory::RemoteDirectory;
use sb_02_connection_broker::{ApplicationFailure, ConnectionBroker, Shell};
use shared_types::ApplicationName;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Broker plus the bundled applications.
pub struct ShellRuntime {
    config: ShellConfig,
    accounts: Arc<LocalAccounts>,
    broker: Arc<ConnectionBroker>,
    startup: Mutex<Option<RemoteDirectory>>,
}

impl ShellRuntime {
    /// Build the runtime. Nothing starts until [`ShellRuntime::start`].
    pub fn new(config: ShellConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let accounts = config
            .accounts
            .iter()
            .fold(LocalAccounts::new(), |accounts, account| {
                accounts.with_consent_account(account.as_str())
            });
        let accounts = Arc::new(accounts);
        let registry = bundled_registry(&config, Arc::clone(&accounts));
        let broker = ConnectionBroker::new(Arc::new(registry), config.broker.clone());

        Ok(Self {
            config,
            accounts,
            broker,
            startup: Mutex::new(None),
        })
    }

    /// Connect to the startup application, if one is configured.
    ///
    /// The connection is held until [`ShellRuntime::shutdown`].
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let Some(target) = &self.config.startup else {
            info!("No startup application configured");
            return;
        };
        info!(target_app = %target, "Connecting to startup application");
        let directory = self.shell().connect_to_application(target, None);
        *self.startup.lock() = Some(directory);
    }

    /// Start, then run until `shutdown` resolves or the startup application
    /// fails fatally. Applications are stopped either way.
    ///
    /// # Errors
    ///
    /// - `ShellError::StartupFailed` - the startup application failed with a
    ///   fatal error
    /// - `ShellError::Signal` - `shutdown` resolved with an error
    pub async fn run<F>(&self, shutdown: F) -> Result<(), ShellError>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        let mut failures = self.broker.subscribe_failures();
        let watched = self
            .config
            .startup
            .as_ref()
            .map(|name| self.broker.resolve(name).instance_key());
        self.start();

        let outcome = tokio::select! {
            signal = shutdown => {
                info!("Initiating graceful shutdown...");
                signal.map_err(ShellError::from)
            }
            failure = startup_failure(&mut failures, watched) => Err(failure),
        };

        self.shutdown().await;
        outcome
    }

    /// A shell acting for the runtime itself. Its requests are anonymous.
    #[must_use]
    pub fn shell(&self) -> Shell {
        self.broker.shell(ApplicationName::new(""))
    }

    /// The broker.
    #[must_use]
    pub fn broker(&self) -> Arc<ConnectionBroker> {
        Arc::clone(&self.broker)
    }

    /// The local account store backing `app:authentication`.
    #[must_use]
    pub fn accounts(&self) -> Arc<LocalAccounts> {
        Arc::clone(&self.accounts)
    }

    /// The configuration in force.
    #[must_use]
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Drop the startup connection and stop every running application.
    ///
    /// Returns the number of applications stopped.
    pub async fn shutdown(&self) -> usize {
        if let Some(directory) = self.startup.lock().take() {
            directory.close();
        }
        let stopped = self.broker.shutdown_all().await;
        info!(stopped, "All applications stopped");
        stopped
    }
}

/// Wait for the watched application to fail fatally. Never resolves when
/// nothing is watched.
async fn startup_failure(
    failures: &mut broadcast::Receiver<ApplicationFailure>,
    watched: Option<ApplicationName>,
) -> ShellError {
    let Some(watched) = watched else {
        return std::future::pending().await;
    };

    loop {
        match failures.recv().await {
            Ok(failure) if failure.name == watched => {
                if failure.is_fatal() {
                    return ShellError::StartupFailed {
                        name: failure.name,
                        source: failure.error,
                    };
                }
                warn!(
                    application = %failure.name,
                    error = %failure.error,
                    "Startup application unavailable"
                );
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed application failures");
            }
            Err(broadcast::error::RecvError::Closed) => return std::future::pending().await,
        }
    }
}
