//! # Pending-Request Correlator
//!
//! Some service calls cannot finish without the user: an account picker, a
//! consent screen. The service suspends the call under a fresh token, asks the
//! host runtime to run the external action, and resumes when the host reports
//! back with that token.
//!
//! ## State Machine
//!
//! ```text
//!            suspend()                 resolve(Granted)
//!  [Idle] ─────────────▶ [Suspended] ──────────────────▶ Deliver → callback(Ok)
//!                           │   │                        RetryOriginal → owner re-issues
//!                           │   │ resolve(Denied/Failed)
//!                           │   └──────────────────────▶ callback(Err)
//!                           │ cancel()
//!                           └──────────────────────────▶ callback(Err(Cancelled))
//!
//!  resolve(token already gone) → Unknown, nothing happens
//! ```
//!
//! ## Threading
//!
//! A `PendingRequestTable` belongs to one application loop and is not shared.
//! Host threads post results through a `ResultSender`; the owning loop drains
//! its `ResultInbox` and calls `resolve` itself.
//!
//! ## Module Structure
//!
//! - `token.rs`  - `Token`, `TokenKind`, request code allocation
//! - `ports.rs`  - `ExternalActionHost`, `ActionDescriptor`, `ExternalOutcome`
//! - `table.rs`  - `PendingRequestTable`, `PendingCall`, `Resolution`
//! - `inbox.rs`  - `ResultSender` / `ResultInbox`
//! - `errors.rs` - `PendingError`

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod errors;
pub mod inbox;
pub mod ports;
pub mod table;
pub mod token;

pub use errors::{PendingError, USER_DENIED};
pub use inbox::{result_channel, ExternalResult, ResultInbox, ResultSender};
pub use ports::{ActionDescriptor, ExternalActionHost, ExternalOutcome};
pub use table::{
    Callback, OnGrant, PendingCall, PendingRequestTable, PendingStats, Resolution, RetryRequest,
    DEFAULT_MAX_RETRIES,
};
pub use token::{Token, TokenKind};
