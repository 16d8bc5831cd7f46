//! # In-Process Host Runtime
//!
//! Wires the bundled applications into a [`LoaderRegistry`] and provides the
//! local stand-ins for the platform's account store and UI.
//!
//! | Name | Application |
//! |------|-------------|
//! | `app:echo` | [`EchoApp`] |
//! | `app:network_service` | [`NetworkApp`] |
//! | `app:authentication` | [`AuthenticationApp`] |
//! | `app:authenticating_network_proxy` | [`AuthenticatingProxyApp`] |

mod accounts;
mod actions;

pub use accounts::{consent_payload, LocalAccounts};
pub use actions::{ActionDecision, LocalActionHost};

use crate::apps::{
    AuthenticatingProxyApp, AuthenticationApp, EchoApp, NetworkApp, TokenProvider,
};
use crate::config::ShellConfig;
use sb_02_connection_broker::{Application, LoaderRegistry};
use std::sync::Arc;

/// Name of the bundled echo application.
pub const ECHO_APP: &str = "app:echo";
/// Name of the bundled network service.
pub const NETWORK_APP: &str = "app:network_service";
/// Name of the bundled authentication application.
pub const AUTHENTICATION_APP: &str = "app:authentication";
/// Name of the bundled authenticating network proxy.
pub const PROXY_APP: &str = "app:authenticating_network_proxy";

/// Loader registry with every bundled application registered.
pub fn bundled_registry(config: &ShellConfig, accounts: Arc<LocalAccounts>) -> LoaderRegistry {
    let registry = LoaderRegistry::new();

    registry.set_loader_for_name(ECHO_APP, |_| Ok(Box::new(EchoApp) as Box<dyn Application>));
    registry.set_loader_for_name(NETWORK_APP, |_| {
        Ok(Box::new(NetworkApp::default()) as Box<dyn Application>)
    });

    let hosts = LocalActionHost::factory(Arc::clone(&accounts), config.action_decision);
    let provider: Arc<dyn TokenProvider> = accounts;
    registry.set_loader_for_name(AUTHENTICATION_APP, move |_| {
        Ok(Box::new(AuthenticationApp::new(Arc::clone(&provider), Arc::clone(&hosts)))
            as Box<dyn Application>)
    });

    let forwarder = config.forwarder;
    registry.set_loader_for_name(PROXY_APP, move |_| {
        Ok(Box::new(AuthenticatingProxyApp::new(forwarder)) as Box<dyn Application>)
    });

    registry
}
