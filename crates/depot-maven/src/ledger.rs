//! Per-entry record of which repositories were verified to serve a coordinate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use depot_core::properties::{load_properties, render_properties};
use depot_util::errors::DepotError;

/// File name of the ledger inside an entry directory.
pub const LEDGER_FILE: &str = "verified.properties";

/// `repository-url=true` lines, loaded on first use and written back in one
/// batch by [`Ledger::flush`].
///
/// Only touched while the entry's directory lock is held.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    table: Option<BTreeMap<String, String>>,
    dirty: bool,
}

impl Ledger {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(LEDGER_FILE),
            table: None,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn table(&mut self) -> miette::Result<&mut BTreeMap<String, String>> {
        let table = match self.table.take() {
            Some(table) => table,
            None => load_properties(&self.path)?,
        };
        Ok(self.table.insert(table))
    }

    pub fn is_verified(&mut self, repo_url: &str) -> miette::Result<bool> {
        Ok(self.table()?.get(repo_url).map(String::as_str) == Some("true"))
    }

    pub fn mark_verified(&mut self, repo_url: &str) -> miette::Result<()> {
        let table = self.table()?;
        if table.get(repo_url).map(String::as_str) != Some("true") {
            table.insert(repo_url.to_string(), "true".to_string());
            self.dirty = true;
        }
        Ok(())
    }

    /// Persist pending changes atomically; a no-op when nothing changed.
    pub fn flush(&mut self) -> miette::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let Some(table) = self.table.as_ref() else {
            return Ok(());
        };
        depot_util::fs::atomic_write(&self.path, render_properties(table).as_bytes())
            .map_err(DepotError::Io)?;
        self.dirty = false;
        tracing::debug!("wrote {}", self.path.display());
        Ok(())
    }

    /// Forget the in-memory state; the next access reloads from disk.
    pub fn reset(&mut self) {
        self.table = None;
        self.dirty = false;
    }
}
