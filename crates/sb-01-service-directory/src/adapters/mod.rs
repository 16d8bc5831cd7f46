//! # Adapters - Directory Channel
//!
//! Both ends of a directory channel: the server loop that runs on the owning
//! application's loop, and the client used by peers to issue lookups.

pub mod remote;
pub mod server;

pub use remote::RemoteDirectory;
pub use server::serve;
