//! Cross-process advisory lock on a cache entry directory.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use depot_util::errors::DepotError;

/// Name of the marker file inside a locked directory.
pub const LOCK_FILE: &str = ".lock";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

static RECLAIMS: AtomicU64 = AtomicU64::new(0);

/// A `.lock` marker created exclusively inside a directory.
///
/// Markers older than `stale_after` belong to a crashed holder and are
/// reclaimed.
#[derive(Debug, Clone)]
pub struct DirectoryLock {
    path: PathBuf,
    stale_after: Duration,
}

impl DirectoryLock {
    pub fn new(dir: &Path, stale_after: Duration) -> Self {
        Self {
            path: dir.join(LOCK_FILE),
            stale_after,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait up to `timeout` for the lock.
    pub async fn acquire(&self, timeout: Duration) -> miette::Result<LockGuard> {
        let started = Instant::now();
        if let Some(parent) = self.path.parent() {
            depot_util::fs::ensure_dir(parent).map_err(DepotError::Io)?;
        }
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
            {
                Ok(mut f) => {
                    if let Err(e) = writeln!(f, "{}", std::process::id()) {
                        tracing::warn!("Failed to record owner in {}: {e}", self.path.display());
                    }
                    tracing::debug!("locked {}", self.path.display());
                    return Ok(LockGuard {
                        path: self.path.clone(),
                        released: false,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if is_stale(&self.path, self.stale_after) {
                        self.reclaim().map_err(DepotError::Io)?;
                        continue;
                    }
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(DepotError::LockTimeout {
                            path: self.path.clone(),
                            waited,
                        }
                        .into());
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(DepotError::Io(e).into()),
            }
        }
    }

    /// Move the marker aside under a name only this call uses, then delete
    /// it if it is still stale. A marker that turned out fresh was just
    /// created by another waiter and is linked back into place.
    fn reclaim(&self) -> std::io::Result<()> {
        let aside = self.path.with_file_name(format!(
            "{LOCK_FILE}.{}.{}.stale",
            std::process::id(),
            RECLAIMS.fetch_add(1, Ordering::Relaxed)
        ));
        match std::fs::rename(&self.path, &aside) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        }

        if is_stale(&aside, self.stale_after) {
            tracing::warn!("Reclaimed stale lock {}", self.path.display());
        } else {
            tracing::debug!("{} was taken meanwhile, restoring", self.path.display());
            match std::fs::hard_link(&aside, &self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => {
                    tracing::warn!("Failed to restore lock {}: {e}", self.path.display());
                }
            }
        }
        remove_marker(&aside)
    }
}

fn is_stale(marker: &Path, stale_after: Duration) -> bool {
    std::fs::metadata(marker)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.elapsed().ok())
        .is_some_and(|age| age >= stale_after)
}

/// Holds a [`DirectoryLock`]; the marker is removed on release or drop.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    pub fn release(mut self) -> miette::Result<()> {
        self.released = true;
        remove_marker(&self.path).map_err(|e| DepotError::Io(e).into())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = remove_marker(&self.path) {
                tracing::warn!("Failed to remove lock {}: {e}", self.path.display());
            }
        }
    }
}

fn remove_marker(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => {
            tracing::debug!("unlocked {}", path.display());
            Ok(())
        }
    }
}
