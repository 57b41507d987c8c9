//! Core data types for depot.
//!
//! This crate defines the fundamental values shared by the resolver:
//! artifact coordinates, dependency scopes, global configuration,
//! property tables with injected environment lookup, and the diagnostics
//! reporting channel.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod coordinate;
pub mod properties;
pub mod report;
pub mod scope;
