//! Ports for the connection broker.

pub mod outbound;

pub use outbound::*;
