//! Process-wide table of cache entries plus the shared background download pool.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use depot_core::config::CacheConfig;
use depot_core::coordinate::Coordinate;
use depot_util::errors::DepotError;

use crate::descriptor::Descriptor;
use crate::download::Fetcher;
use crate::entry::{BoxFuture, CacheEntry};
use crate::pom::{parse_pom, Pom};
use crate::repository::RemoteRepository;

/// Parent chains longer than this are rejected as malformed.
pub const MAX_PARENT_DEPTH: usize = 32;

/// Tunables for cache entries and the worker pool.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub lock_timeout: Duration,
    pub stale_lock_after: Duration,
    /// Cached files smaller than this are treated as missing.
    pub min_file_size: u64,
    /// Background download slots; 0 runs downloads inline.
    pub workers: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default(), 4)
    }
}

impl RegistrySettings {
    pub fn from_config(cache: &CacheConfig, workers: usize) -> Self {
        Self {
            lock_timeout: cache.lock_timeout(),
            stale_lock_after: cache.stale_lock_after(),
            min_file_size: cache.min_file_size,
            workers,
        }
    }
}

/// A unit of scheduled work producing an artifact path.
#[derive(Debug)]
pub enum FetchHandle {
    Pending(JoinHandle<miette::Result<PathBuf>>),
    Ready(miette::Result<PathBuf>),
}

impl FetchHandle {
    pub fn is_finished(&self) -> bool {
        match self {
            FetchHandle::Pending(handle) => handle.is_finished(),
            FetchHandle::Ready(_) => true,
        }
    }

    pub fn abort(&self) {
        if let FetchHandle::Pending(handle) = self {
            handle.abort();
        }
    }

    pub async fn wait(self) -> miette::Result<PathBuf> {
        match self {
            FetchHandle::Ready(result) => result,
            FetchHandle::Pending(handle) => handle.await.map_err(|e| DepotError::Generic {
                message: format!("Background download did not complete: {e}"),
            })?,
        }
    }
}

struct RegistryInner {
    root: PathBuf,
    entries: Mutex<HashMap<String, Arc<CacheEntry>>>,
    pool: Option<Arc<Semaphore>>,
    fetcher: Fetcher,
    settings: RegistrySettings,
}

/// Interns one [`CacheEntry`] per coordinate under a cache root.
///
/// Cheap to clone; clones share the table, the pool and the fetcher.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("root", &self.inner.root)
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl Registry {
    pub fn new(root: impl Into<PathBuf>, fetcher: Fetcher, settings: RegistrySettings) -> Self {
        let pool = (settings.workers > 0).then(|| Arc::new(Semaphore::new(settings.workers)));
        Self {
            inner: Arc::new(RegistryInner {
                root: root.into(),
                entries: Mutex::new(HashMap::new()),
                pool,
                fetcher,
                settings,
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.inner.fetcher
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.inner.settings
    }

    /// The unique entry for `coord`, created on first request.
    pub fn get_entry(&self, coord: &Coordinate) -> miette::Result<Arc<CacheEntry>> {
        let Some(path) = coord.path() else {
            return Err(DepotError::VersionNotSet {
                coordinate: coord.to_string(),
            }
            .into());
        };
        if !coord.is_path_safe() {
            return Err(DepotError::InvalidCoordinate {
                coordinate: coord.to_string(),
            }
            .into());
        }
        let mut entries = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(path).or_insert_with_key(|path| {
            Arc::new(CacheEntry::new(
                coord.clone(),
                self.inner.root.join(path),
                self.inner.settings.stale_lock_after,
            ))
        });
        Ok(Arc::clone(entry))
    }

    /// Run `task` on the worker pool, or inline when the registry has none.
    pub async fn schedule<F>(&self, task: F) -> FetchHandle
    where
        F: Future<Output = miette::Result<PathBuf>> + Send + 'static,
    {
        match &self.inner.pool {
            None => FetchHandle::Ready(task.await),
            Some(pool) => {
                let pool = Arc::clone(pool);
                FetchHandle::Pending(tokio::spawn(async move {
                    let _permit = pool.acquire_owned().await.map_err(|e| {
                        DepotError::Generic {
                            message: format!("Download pool closed: {e}"),
                        }
                    })?;
                    task.await
                }))
            }
        }
    }

    /// Resolve the descriptor for `coord` from the first verifying repository.
    pub async fn descriptor(
        &self,
        coord: &Coordinate,
        repos: &[RemoteRepository],
    ) -> miette::Result<Option<Arc<Descriptor>>> {
        self.get_entry(coord)?.resolve_descriptor(self, repos).await
    }

    /// Parse a project POM from disk (a `pom.xml` file or its directory).
    ///
    /// Its parent is looked up through `relativePath` first, then through the
    /// repositories.
    pub async fn project_descriptor(
        &self,
        path: &Path,
        repos: &[RemoteRepository],
    ) -> miette::Result<Arc<Descriptor>> {
        let file = if path.is_dir() {
            path.join("pom.xml")
        } else {
            path.to_path_buf()
        };
        let xml = std::fs::read_to_string(&file).map_err(|e| DepotError::Generic {
            message: format!("Failed to read {}: {e}", file.display()),
        })?;
        let pom = parse_pom(&xml)?;
        let base_dir = std::path::absolute(&file)
            .map_err(DepotError::Io)?
            .parent()
            .map(Path::to_path_buf);
        let chain = vec![file_key(&file)];
        let parent = self
            .resolve_parent(&pom, base_dir.as_deref(), repos, &chain)
            .await?;
        Ok(Arc::new(Descriptor::inherit(pom, parent, base_dir, None)?))
    }

    /// Evict `coord`'s entry; returns whether anything was on disk.
    pub async fn evict(&self, coord: &Coordinate) -> miette::Result<bool> {
        let entry = self.get_entry(coord)?;
        let existed = entry.dir().exists();
        entry.evict(self.inner.settings.lock_timeout).await?;
        Ok(existed)
    }

    /// Wait for every background download started so far.
    pub async fn wait_pending(&self) {
        let entries: Vec<Arc<CacheEntry>> = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for entry in entries {
            entry.wait_pending().await;
        }
    }

    /// Resolve the parent of `pom`, if it declares one.
    ///
    /// `visiting` holds the keys of the descriptors below this one in the
    /// chain being built.
    pub(crate) fn resolve_parent<'a>(
        &'a self,
        pom: &'a Pom,
        base_dir: Option<&'a Path>,
        repos: &'a [RemoteRepository],
        visiting: &'a [String],
    ) -> BoxFuture<'a, miette::Result<Option<Arc<Descriptor>>>> {
        Box::pin(async move {
            let Some(parent_ref) = &pom.parent else {
                return Ok(None);
            };
            if visiting.len() >= MAX_PARENT_DEPTH {
                return Err(malformed(format!(
                    "parent chain deeper than {MAX_PARENT_DEPTH} at {}:{}",
                    parent_ref.group_id, parent_ref.artifact_id
                )));
            }

            if let Some(base) = base_dir {
                let relative = parent_ref
                    .relative_path
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or("../pom.xml");
                if !relative.is_empty() {
                    let mut candidate = base.join(relative);
                    if candidate.is_dir() {
                        candidate = candidate.join("pom.xml");
                    }
                    if let Some(local) = self
                        .local_parent(&candidate, &parent_ref.artifact_id, repos, visiting)
                        .await?
                    {
                        return Ok(Some(local));
                    }
                }
            }

            let coord = Coordinate::new(
                parent_ref.group_id.trim(),
                parent_ref.artifact_id.trim(),
                &parent_ref.version,
            );
            let key = coord.key().ok_or_else(|| {
                malformed(format!("parent {coord} does not declare a version"))
            })?;
            if visiting.contains(&key) {
                return Err(malformed(format!("parent cycle through {coord}")));
            }
            let entry = self.get_entry(&coord)?;
            match entry.resolve_in(self, repos, visiting).await? {
                Some(parent) => Ok(Some(parent)),
                None => Err(DepotError::NotFound {
                    coordinate: format!("{coord} (parent)"),
                }
                .into()),
            }
        })
    }

    async fn local_parent(
        &self,
        candidate: &Path,
        artifact_id: &str,
        repos: &[RemoteRepository],
        visiting: &[String],
    ) -> miette::Result<Option<Arc<Descriptor>>> {
        if !candidate.is_file() {
            return Ok(None);
        }
        let Ok(xml) = std::fs::read_to_string(candidate) else {
            return Ok(None);
        };
        let Ok(pom) = parse_pom(&xml) else {
            tracing::debug!("ignoring unparsable {}", candidate.display());
            return Ok(None);
        };
        if pom.artifact_id.as_deref().map(str::trim) != Some(artifact_id.trim()) {
            return Ok(None);
        }
        let key = file_key(candidate);
        if visiting.contains(&key) {
            return Err(malformed(format!(
                "parent cycle through {}",
                candidate.display()
            )));
        }
        let mut chain = visiting.to_vec();
        chain.push(key);
        let dir = candidate.parent().map(Path::to_path_buf);
        let grandparent = self
            .resolve_parent(&pom, dir.as_deref(), repos, &chain)
            .await?;
        Ok(Some(Arc::new(Descriptor::inherit(pom, grandparent, dir, None)?)))
    }
}

fn file_key(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file:{}", resolved.display())
}

fn malformed(message: String) -> miette::Report {
    DepotError::Descriptor { message }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::build_client;

    fn registry(root: &Path, workers: usize) -> Registry {
        let settings = RegistrySettings {
            workers,
            ..RegistrySettings::default()
        };
        Registry::new(root, Fetcher::new(build_client().unwrap()), settings)
    }

    #[test]
    fn same_coordinate_same_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry(tmp.path(), 0);
        let a = reg.get_entry(&Coordinate::new("org.x", "lib", "1.0")).unwrap();
        let b = reg.get_entry(&Coordinate::new("org.x", "lib", "1.0")).unwrap();
        let c = reg.get_entry(&Coordinate::new("org.x", "lib", "1.1")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a.dir(), tmp.path().join("org/x/lib/1.0"));
        assert_eq!(a.descriptor_path(), tmp.path().join("org/x/lib/1.0/lib-1.0.pom"));
    }

    #[test]
    fn unset_version_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry(tmp.path(), 0);
        let err = reg.get_entry(&Coordinate::new("org.x", "lib", "")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DepotError>(),
            Some(DepotError::VersionNotSet { .. })
        ));
    }

    #[tokio::test]
    async fn inline_schedule_is_complete() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry(tmp.path(), 0);
        let handle = reg.schedule(async { Ok(PathBuf::from("x.jar")) }).await;
        assert!(handle.is_finished());
        assert_eq!(handle.wait().await.unwrap(), PathBuf::from("x.jar"));
    }

    #[tokio::test]
    async fn pooled_schedule_runs_and_can_abort() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry(tmp.path(), 1);
        let done = reg.schedule(async { Ok(PathBuf::from("a.jar")) }).await;
        assert_eq!(done.wait().await.unwrap(), PathBuf::from("a.jar"));

        let slow = reg
            .schedule(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(PathBuf::from("never"))
            })
            .await;
        slow.abort();
        assert!(slow.wait().await.is_err());
    }
}
