//! # Domain Layer - Service Directory
//!
//! - `directory`: the name → factory table and its duplicate policy
//! - `context`: who is connecting and what they expose back
//! - `errors`: `DirectoryError`

pub mod context;
pub mod directory;
pub mod errors;

pub use context::*;
pub use directory::*;
pub use errors::*;
