//! # Pipe Forwarder
//!
//! Splices two channel ends together. Every message read on one side is
//! written, unchanged and in order, to the other, including any endpoints it
//! carries. The forwarder never looks at payloads.
//!
//! ```text
//!  client ══ X ─┐                      ┌─ Y ══ real service
//!               │   ┌──────────────┐   │
//!               └──▶│ PipeForwarder│◀──┘
//!                   │  X → Y       │
//!                   │  Y → X       │
//!                   └──────────────┘
//! ```
//!
//! Interposition works by terminating the client-facing end, doing whatever
//! setup the policy needs, opening a new connection to the real target and
//! forwarding between the two.
//!
//! ## Termination
//!
//! A disconnect on either side, or a failed write to either side, ends the
//! relay. Both ends are then closed, so each peer observes a disconnect. An
//! idle wait that times out is not a termination; the relay keeps waiting.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod forwarder;

pub use forwarder::{ForwardReport, ForwarderConfig, ForwarderHandle, PipeForwarder, Side};
