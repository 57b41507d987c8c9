use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all depot operations.
#[derive(Debug, Error, Diagnostic)]
pub enum DepotError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The coordinate is absent from every candidate repository.
    #[error("Not found: {coordinate}")]
    #[diagnostic(help("Check the coordinate and the repository list"))]
    NotFound { coordinate: String },

    /// A coordinate without a version cannot be cached or fetched.
    #[error("No version set for {coordinate}")]
    #[diagnostic(help("Pass a full group:artifact:version coordinate"))]
    VersionNotSet { coordinate: String },

    /// A coordinate component that is not a plain directory name.
    #[error("Invalid coordinate {coordinate}: components must be plain directory names")]
    InvalidCoordinate { coordinate: String },

    /// A digest was missing or did not match.
    #[error("Verification failed: {message}")]
    Verification { message: String },

    /// Another process holds the cache directory lock.
    #[error("Timed out after {}s waiting for lock {}", waited.as_secs(), path.display())]
    #[diagnostic(help(
        "Another process may be stuck; the lock is reclaimed automatically once it goes stale"
    ))]
    LockTimeout { path: PathBuf, waited: Duration },

    /// Malformed POM or descriptor structure.
    #[error("Malformed descriptor: {message}")]
    Descriptor { message: String },

    /// A descriptor field that does not parse into its typed form.
    #[error("Malformed descriptor: {message}")]
    DescriptorField {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Network request or download failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Invalid configuration or command-line input.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check ~/.depot/config.toml and the command-line flags"))]
    Config { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type DepotResult<T> = miette::Result<T>;
