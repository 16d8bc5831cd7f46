//! # Broker Service
//!
//! - `broker`: instance table and connection requests
//! - `instance`: the message loop each running application gets
//! - `shell`: the handle applications use to reach other applications

pub mod broker;
pub(crate) mod instance;
pub mod shell;

pub use broker::ConnectionBroker;
pub use shell::Shell;
