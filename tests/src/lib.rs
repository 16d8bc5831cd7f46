//! # Shell-Broker Test Suite
//!
//! Scenarios that cross crate boundaries: a real broker, real applications,
//! real channels.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs          # connect, lookup, ordering, unknown targets
//!     ├── interposition.rs  # forwarder between client and service
//!     └── authorization.rs  # suspended calls and the retry path
//! tests/benches/
//! └── broker_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sb-tests
//! cargo test -p sb-tests integration::authorization
//! cargo bench -p sb-tests
//! ```

pub mod integration;
