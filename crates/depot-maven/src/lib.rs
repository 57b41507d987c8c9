//! Maven repository protocol: POM parsing and inheritance, artifact download,
//! checksum verification, and the locked local cache behind a registry.

pub mod checksum;
pub mod descriptor;
pub mod download;
pub mod entry;
pub mod ledger;
pub mod lock;
pub mod macros;
pub mod pom;
pub mod registry;
pub mod repository;
