//! # Shared Types Crate
//!
//! Names, error taxonomy and the directory wire protocol shared by the
//! broker crates.
//!
//! ## Design Principles
//!
//! - **Opaque Names**: `ApplicationName` and `InterfaceName` are plain strings
//!   with no structure beyond an optional scheme and query suffix.
//! - **One Taxonomy**: every crate-local error converts into `BrokerError`,
//!   which carries the four outcome kinds the broker distinguishes.
//! - **No Service Payloads**: the only wire format defined here is the
//!   directory request; service-specific encoding belongs to each service.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod entities;
pub mod errors;
pub mod ipc;

pub use entities::*;
pub use errors::*;
pub use ipc::*;
