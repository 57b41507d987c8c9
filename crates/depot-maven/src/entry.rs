//! One cached coordinate: its directory, lock, verification ledger and parsed descriptors.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use depot_core::coordinate::Coordinate;
use depot_util::errors::DepotError;
use depot_util::fs::{atomic_write, file_len};

use crate::checksum;
use crate::descriptor::Descriptor;
use crate::download::Fetcher;
use crate::ledger::Ledger;
use crate::lock::DirectoryLock;
use crate::pom::{parse_pom, Pom};
use crate::registry::{FetchHandle, Registry};
use crate::repository::RemoteRepository;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A verified descriptor read under the directory lock, not yet inherited.
struct Loaded {
    repo: RemoteRepository,
    pom: Pom,
    needs_artifact: bool,
}

/// State only touched by the task currently resolving this entry.
#[derive(Debug)]
struct EntryState {
    ledger: Ledger,
}

/// The cache slot for one coordinate.
///
/// Interned by the [`Registry`]; every task in the process that asks for the
/// same coordinate shares one instance.
#[derive(Debug)]
pub struct CacheEntry {
    coordinate: Coordinate,
    dir: PathBuf,
    descriptor_path: PathBuf,
    artifact_path: PathBuf,
    lock: DirectoryLock,
    state: tokio::sync::Mutex<EntryState>,
    descriptors: Mutex<HashMap<String, Arc<Descriptor>>>,
    fetch: tokio::sync::Mutex<Option<FetchHandle>>,
}

impl CacheEntry {
    pub(crate) fn new(coordinate: Coordinate, dir: PathBuf, stale_lock_after: Duration) -> Self {
        Self {
            descriptor_path: dir.join(coordinate.file_name("pom")),
            artifact_path: dir.join(coordinate.file_name("jar")),
            lock: DirectoryLock::new(&dir, stale_lock_after),
            state: tokio::sync::Mutex::new(EntryState {
                ledger: Ledger::new(&dir),
            }),
            descriptors: Mutex::new(HashMap::new()),
            fetch: tokio::sync::Mutex::new(None),
            coordinate,
            dir,
        }
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Path of the dependency listing for `scope`, e.g. `lib-1.0.compile.deps`.
    pub fn listing_path(&self, scope: &str) -> PathBuf {
        self.dir
            .join(self.coordinate.file_name(&format!("{scope}.deps")))
    }

    /// The descriptor for this coordinate, attributed to the first of
    /// `repos` that verifiably serves it. `Ok(None)` means no candidate did.
    pub async fn resolve_descriptor(
        &self,
        registry: &Registry,
        repos: &[RemoteRepository],
    ) -> miette::Result<Option<Arc<Descriptor>>> {
        self.resolve_in(registry, repos, &[]).await
    }

    pub(crate) fn resolve_in<'a>(
        &'a self,
        registry: &'a Registry,
        repos: &'a [RemoteRepository],
        visiting: &'a [String],
    ) -> BoxFuture<'a, miette::Result<Option<Arc<Descriptor>>>> {
        Box::pin(async move {
            if let Some(found) = self.in_memory(repos) {
                return Ok(Some(found));
            }

            let settings = registry.settings();
            let started = Instant::now();
            let mut state = tokio::time::timeout(settings.lock_timeout, self.state.lock())
                .await
                .map_err(|_| DepotError::LockTimeout {
                    path: self.lock.path().to_path_buf(),
                    waited: started.elapsed(),
                })?;
            if let Some(found) = self.in_memory(repos) {
                return Ok(Some(found));
            }

            let Some(loaded) = self.load(&mut state.ledger, registry, repos).await? else {
                tracing::debug!("{} not found in any candidate repository", self.coordinate);
                return Ok(None);
            };

            let mut chain = visiting.to_vec();
            chain.push(self.key());
            let parent = registry
                .resolve_parent(&loaded.pom, Some(self.dir.as_path()), repos, &chain)
                .await?;
            let descriptor = Arc::new(Descriptor::inherit(
                loaded.pom,
                parent,
                Some(self.dir.clone()),
                Some(loaded.repo.url().to_string()),
            )?);
            self.descriptors
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(loaded.repo.url().to_string(), Arc::clone(&descriptor));

            if loaded.needs_artifact {
                let job = ArtifactJob {
                    coordinate: self.coordinate.clone(),
                    artifact_path: self.artifact_path.clone(),
                    lock: self.lock.clone(),
                    fetcher: registry.fetcher().clone(),
                    repo: loaded.repo,
                    lock_timeout: settings.lock_timeout,
                    min_file_size: settings.min_file_size,
                };
                let handle = registry.schedule(job.run()).await;
                *self.fetch.lock().await = Some(handle);
            }
            drop(state);
            Ok(Some(descriptor))
        })
    }

    fn key(&self) -> String {
        self.coordinate
            .key()
            .unwrap_or_else(|| self.coordinate.to_string())
    }

    fn in_memory(&self, repos: &[RemoteRepository]) -> Option<Arc<Descriptor>> {
        let map = self.descriptors.lock().unwrap_or_else(|e| e.into_inner());
        repos.iter().find_map(|r| map.get(r.url()).cloned())
    }

    /// Serve or download the descriptor while holding the directory lock.
    ///
    /// The ledger is flushed and the lock released on every path out.
    async fn load(
        &self,
        ledger: &mut Ledger,
        registry: &Registry,
        repos: &[RemoteRepository],
    ) -> miette::Result<Option<Loaded>> {
        let guard = self.lock.acquire(registry.settings().lock_timeout).await?;
        let result = self.load_locked(ledger, registry, repos).await;
        let flushed = ledger.flush();
        guard.release()?;
        let loaded = result?;
        flushed?;
        Ok(loaded)
    }

    async fn load_locked(
        &self,
        ledger: &mut Ledger,
        registry: &Registry,
        repos: &[RemoteRepository],
    ) -> miette::Result<Option<Loaded>> {
        let min = registry.settings().min_file_size;
        let fetcher = registry.fetcher();
        let relative = RemoteRepository::pom_path(&self.coordinate).ok_or_else(|| {
            DepotError::VersionNotSet {
                coordinate: self.coordinate.to_string(),
            }
        })?;
        let artifact_ok = file_len(&self.artifact_path).is_some_and(|n| n >= min);

        if file_len(&self.descriptor_path).is_some_and(|n| n >= min) {
            let bytes = std::fs::read(&self.descriptor_path).map_err(DepotError::Io)?;
            let pom = parse_pom(&String::from_utf8_lossy(&bytes))?;
            if artifact_ok || is_pom_only(&pom) {
                for repo in repos {
                    if ledger.is_verified(repo.url())? {
                        tracing::debug!("cache hit for {} ({repo})", self.coordinate);
                        return Ok(Some(Loaded {
                            repo: repo.clone(),
                            pom,
                            needs_artifact: false,
                        }));
                    }
                }
                for repo in repos {
                    if checksum::verify(fetcher, repo, &relative, &bytes).await.is_some() {
                        ledger.mark_verified(repo.url())?;
                        tracing::debug!("cached {} verified against {repo}", self.coordinate);
                        return Ok(Some(Loaded {
                            repo: repo.clone(),
                            pom,
                            needs_artifact: false,
                        }));
                    }
                }
                return Ok(None);
            }
        }

        for repo in repos {
            let bytes = match fetcher.fetch(repo, &relative).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    tracing::debug!("{} not in {repo}", self.coordinate);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Fetching {} from {repo} failed: {e}", self.coordinate);
                    continue;
                }
            };
            if checksum::verify(fetcher, repo, &relative, &bytes).await.is_none() {
                tracing::warn!(
                    "Ignoring {} from {repo}: no matching checksum",
                    self.coordinate
                );
                continue;
            }
            let pom = parse_pom(&String::from_utf8_lossy(&bytes))?;
            atomic_write(&self.descriptor_path, &bytes).map_err(DepotError::Io)?;
            ledger.mark_verified(repo.url())?;
            tracing::info!("Downloaded {} from {repo}", self.coordinate);
            return Ok(Some(Loaded {
                repo: repo.clone(),
                needs_artifact: !artifact_ok && !is_pom_only(&pom),
                pom,
            }));
        }
        Ok(None)
    }

    /// The artifact file, waiting for its background download if one is running.
    pub async fn resolve_artifact(&self) -> miette::Result<PathBuf> {
        let mut pending = self.fetch.lock().await;
        if let Some(handle) = pending.take() {
            return handle.wait().await;
        }
        if self.artifact_path.is_file() {
            Ok(self.artifact_path.clone())
        } else {
            Err(DepotError::NotFound {
                coordinate: self.coordinate.to_string(),
            }
            .into())
        }
    }

    /// Wait for a pending background download, logging its failure.
    pub async fn wait_pending(&self) {
        let handle = self.fetch.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.wait().await {
                tracing::warn!("Background download of {} failed: {e}", self.coordinate);
            }
        }
    }

    /// Write a file into the entry directory under the directory lock.
    pub async fn store(&self, path: &Path, data: &[u8], lock_timeout: Duration) -> miette::Result<()> {
        let guard = self.lock.acquire(lock_timeout).await?;
        let written = atomic_write(path, data);
        guard.release()?;
        written.map_err(DepotError::Io)?;
        Ok(())
    }

    /// Drop everything known about this coordinate, on disk and in memory.
    pub async fn evict(&self, lock_timeout: Duration) -> miette::Result<()> {
        if let Some(handle) = self.fetch.lock().await.take() {
            handle.abort();
        }
        let mut state = self.state.lock().await;
        self.descriptors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        state.ledger.reset();

        if !self.dir.exists() {
            return Ok(());
        }
        let guard = self.lock.acquire(lock_timeout).await?;
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(DepotError::Io(e).into()),
        }
        drop(guard);
        tracing::info!("Evicted {}", self.coordinate);
        Ok(())
    }
}

fn is_pom_only(pom: &Pom) -> bool {
    pom.packaging.as_deref().map(str::trim) == Some("pom")
}

/// Background download of an entry's binary artifact.
struct ArtifactJob {
    coordinate: Coordinate,
    artifact_path: PathBuf,
    lock: DirectoryLock,
    fetcher: Fetcher,
    repo: RemoteRepository,
    lock_timeout: Duration,
    min_file_size: u64,
}

impl ArtifactJob {
    async fn run(self) -> miette::Result<PathBuf> {
        let _guard = self.lock.acquire(self.lock_timeout).await?;
        if file_len(&self.artifact_path).is_some_and(|n| n >= self.min_file_size) {
            return Ok(self.artifact_path);
        }
        let relative = RemoteRepository::jar_path(&self.coordinate).ok_or_else(|| {
            DepotError::VersionNotSet {
                coordinate: self.coordinate.to_string(),
            }
        })?;
        let Some(bytes) = self.fetcher.fetch(&self.repo, &relative).await? else {
            return Err(DepotError::NotFound {
                coordinate: format!("{} (jar in {})", self.coordinate, self.repo),
            }
            .into());
        };
        if checksum::verify(&self.fetcher, &self.repo, &relative, &bytes)
            .await
            .is_none()
        {
            return Err(DepotError::Verification {
                message: format!("no matching checksum for {}", self.repo.file_url(&relative)),
            }
            .into());
        }
        atomic_write(&self.artifact_path, &bytes).map_err(DepotError::Io)?;
        tracing::info!("Downloaded {} from {}", relative, self.repo);
        Ok(self.artifact_path)
    }
}
