//! # Shared Channel - Message Channels Between Applications
//!
//! A channel is a pair of endpoints with exactly one peer each. Messages
//! written on one end are read, whole and in order, from the other.
//!
//! ```text
//! ┌──────────────┐                       ┌──────────────┐
//! │ Owner A      │   write()    read()   │ Owner B      │
//! │  ChannelEnd ─┼──────────────────────▶│─ ChannelEnd  │
//! │              │◀──────────────────────┼─             │
//! └──────────────┘   read()    write()   └──────────────┘
//! ```
//!
//! ## Ownership
//!
//! - A `ChannelEnd` is not `Clone`; it is moved to transfer ownership.
//! - Messages can carry endpoints, which moves them to the reader.
//! - Closing (or dropping) an end is observed by the peer as a disconnect
//!   once it has drained what was written before the close.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod endpoint;
pub mod message;

pub use endpoint::{channel, ChannelEnd, ChannelError, CloseWatch, EndpointId};
pub use message::Message;
