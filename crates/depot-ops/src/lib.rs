//! Operations behind the `depot` commands.
//!
//! Each `ops_*` module takes an open [`Session`] and returns plain values;
//! printing is left to the CLI.

pub mod ops_evict;
pub mod ops_fetch;
pub mod ops_pom;
pub mod ops_resolve;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use depot_core::config::GlobalConfig;
use depot_core::properties::{Environment, MapEnvironment};
use depot_core::scope::Scope;
use depot_maven::download::{build_client, Fetcher};
use depot_maven::registry::{Registry, RegistrySettings};
use depot_maven::repository::{parse_all, RemoteRepository};

/// Command-line values that take precedence over `~/.depot/config.toml`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cache_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    /// Replaces the configured repositories when non-empty.
    pub repositories: Vec<String>,
    /// Macro values that win over the process environment.
    pub defines: BTreeMap<String, String>,
}

/// A registry and repository list set up for one invocation.
pub struct Session {
    pub config: GlobalConfig,
    pub registry: Registry,
    pub repos: Vec<RemoteRepository>,
    pub env: Arc<dyn Environment>,
}

impl Session {
    pub fn open(config: GlobalConfig, overrides: &Overrides) -> miette::Result<Self> {
        let cache_dir = overrides
            .cache_dir
            .clone()
            .unwrap_or_else(|| config.cache.dir_path());
        let workers = overrides.workers.unwrap_or(config.resolver.workers);
        let urls = if overrides.repositories.is_empty() {
            config.repository_urls()
        } else {
            overrides.repositories.clone()
        };
        let repos = parse_all(&urls)?;

        tracing::debug!(
            "cache {} with {workers} workers, {} repositories",
            cache_dir.display(),
            repos.len()
        );
        let settings = RegistrySettings::from_config(&config.cache, workers);
        let registry = Registry::new(cache_dir, Fetcher::new(build_client()?), settings);
        Ok(Self {
            config,
            registry,
            repos,
            env: Arc::new(MapEnvironment::with_process(overrides.defines.clone())),
        })
    }

    pub fn default_scope(&self) -> Scope {
        self.config.resolver.default_scope
    }

    /// Let background downloads finish before the process exits.
    pub async fn close(&self) {
        self.registry.wait_pending().await;
    }
}
