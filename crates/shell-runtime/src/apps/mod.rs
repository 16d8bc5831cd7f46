//! Bundled applications.

pub mod authentication;
pub mod echo;
pub mod network;
pub mod proxy;

pub use authentication::{
    ActionHostFactory, AuthReply, AuthRequest, AuthenticationApp, TokenError, TokenProvider,
    AUTHENTICATION_INTERFACE,
};
pub use echo::{EchoApp, ECHO_INTERFACE};
pub use network::{NetworkApp, NETWORK_INTERFACE};
pub use proxy::AuthenticatingProxyApp;
