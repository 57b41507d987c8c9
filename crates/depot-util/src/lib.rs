//! Shared utilities for depot.
//!
//! This crate provides cross-cutting concerns used by all other depot crates:
//! error types, filesystem helpers (including atomic commits), digest
//! hashing, and terminal progress indicators.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
