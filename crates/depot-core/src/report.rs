//! Diagnostics channel for non-fatal resolution problems.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

/// Receives errors and warnings that must not abort a resolution.
pub trait Reporter: Send + Sync {
    fn error(&self, message: &str);
    fn warning(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.message),
            Severity::Warning => write!(f, "warning: {}", self.message),
        }
    }
}

/// Collects diagnostics in report order and mirrors them to `tracing`.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, severity: Severity, message: &str) {
        self.items().push(Diagnostic {
            severity,
            message: message.to_string(),
        });
    }

    /// Snapshot of everything reported so far.
    pub fn to_vec(&self) -> Vec<Diagnostic> {
        self.items().clone()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

impl Reporter for Diagnostics {
    fn error(&self, message: &str) {
        tracing::debug!("diagnostic error: {message}");
        self.push(Severity::Error, message);
    }

    fn warning(&self, message: &str) {
        tracing::debug!("diagnostic warning: {message}");
        self.push(Severity::Warning, message);
    }
}

/// Forwards diagnostics to `tracing` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }
}
