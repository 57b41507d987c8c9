//! Dependency closure engine: breadth-first transitive resolution with
//! ancestry-aware exclusions, scope filtering, and dependency listings.

pub mod closure;
pub mod listing;
pub mod remote;
