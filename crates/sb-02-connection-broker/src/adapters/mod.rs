//! # Adapters
//!
//! `LoaderRegistry`: an in-process `HostRuntime` that picks a loader by exact
//! name, then by scheme, then falls back to a default loader.

pub mod loader_registry;

pub use loader_registry::{ApplicationLoader, LoaderRegistry};
