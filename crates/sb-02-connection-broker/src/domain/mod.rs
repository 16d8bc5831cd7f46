//! # Domain Layer - Connection Broker

pub mod config;
pub mod connection;
pub mod failure;
pub mod mappings;

pub use config::*;
pub use connection::*;
pub use failure::*;
pub use mappings::*;
