//! # Service Directory
//!
//! Every application owns one directory mapping interface names to factories.
//! A peer reaches it through a directory channel: each lookup request carries
//! a fresh channel end, which the directory hands to the matching factory or
//! closes immediately when nothing is registered under that name.
//!
//! ```text
//!   requester                              target application
//! ┌──────────────────┐  ConnectToService ┌───────────────────────────────┐
//! │ RemoteDirectory ─┼──────("Echo", ⟂)──┼─▶ serve() ──▶ ServiceDirectory│
//! │                  │                   │                 │  hit        │
//! │   ChannelEnd  ◀══╪═══════════════════╪══ ⟂ ◀── factory ┘             │
//! └──────────────────┘                   │            miss ─▶ close(⟂)   │
//!                                        └───────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - `domain/directory.rs` - `ServiceDirectory`, `DuplicatePolicy`, `ServiceFactory`
//! - `domain/context.rs`   - `ConnectionContext` handed to every factory
//! - `domain/errors.rs`    - `DirectoryError`
//! - `adapters/server.rs`  - `serve()` loop decoding directory requests
//! - `adapters/remote.rs`  - `RemoteDirectory` client and the inert directory
//!
//! ## Invariants
//!
//! - A lookup miss always closes the supplied endpoint and never blocks.
//! - Every hit invokes the factory once; instances are never shared between
//!   lookups unless the factory itself shares state.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;

pub use adapters::{serve, RemoteDirectory};
pub use domain::{
    ConnectionContext, DirectoryError, DuplicatePolicy, ServiceDirectory, ServiceFactory,
};
