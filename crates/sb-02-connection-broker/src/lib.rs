//! # Connection Broker
//!
//! Resolves an application name to a running instance, starting it through
//! the host runtime when needed, and wires a channel pair between the
//! requester and the instance's service directory.
//!
//! ## Connection Flow
//!
//! ```text
//! connect("app:echo?x=1", requestor, exposes)
//!     │ NameMappings::apply (aliases, to a fixed point)
//!     ▼
//! ┌──────────────────────────────────────────────┐
//! │ instances: Mutex<HashMap<key, InstanceSlot>> │  key = "app:echo"
//! │   hit  → push onto slot inbox                │  (one critical section)
//! │   miss → new slot, push, spawn instance task │
//! └──────────────────────────────────────────────┘
//!     │ forward ⟂ (+ reverse ⟂)
//!     ▼
//! ┌──────────────── instance task ───────────────┐
//! │ HostRuntime::create_application_instance()   │
//! │ Application::initialize(shell, args, dir)    │
//! │ loop: inbox → serve(dir, forward, ctx)       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Requests for one target are resolved in issuance order.
//! - Requests for different targets never wait on each other.
//! - A target that cannot be started leaves no partial connection: every
//!   queued request is dropped and its channels close. The failure is
//!   broadcast to `subscribe_failures()` receivers.
//! - Closing either channel of a connection closes the other.
//!
//! ## Module Structure
//!
//! - `ports/outbound.rs`  - `HostRuntime`, `Application`
//! - `domain/`            - `BrokerConfig`, `NameMappings`, `Connection`, `ApplicationFailure`
//! - `service/broker.rs`  - `ConnectionBroker`
//! - `service/instance.rs`- per-instance message loop
//! - `service/shell.rs`   - `Shell` handle given to applications
//! - `adapters/`          - `LoaderRegistry` host runtime

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{ApplicationLoader, LoaderRegistry};
pub use domain::{ApplicationFailure, BrokerConfig, Connection, NameMappings};
pub use error::HostError;
pub use ports::{Application, HostRuntime};
pub use service::{ConnectionBroker, Shell};
