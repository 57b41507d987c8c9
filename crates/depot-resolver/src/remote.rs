//! Lookup by `group+artifact` name: an artifact file, or a dependency listing for a scope.

use std::path::PathBuf;
use std::sync::Arc;

use depot_core::coordinate::Coordinate;
use depot_core::properties::Environment;
use depot_core::report::Diagnostic;
use depot_core::scope::Scope;
use depot_maven::registry::Registry;
use depot_maven::repository::RemoteRepository;
use depot_util::errors::DepotError;

use crate::closure::ClosureEngine;
use crate::listing::{render_listing, write_listing};

/// What [`RemoteResolver::get`] produced.
#[derive(Debug)]
pub struct Fetched {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct RemoteResolver {
    registry: Registry,
    engine: ClosureEngine,
}

impl RemoteResolver {
    pub fn new(registry: Registry, repos: Vec<RemoteRepository>) -> Self {
        Self {
            engine: ClosureEngine::new(registry.clone(), repos),
            registry,
        }
    }

    pub fn with_environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.engine = self.engine.with_environment(env);
        self
    }

    /// Resolve `name` (`group+artifact`) at `version`.
    ///
    /// Without a scope this returns the artifact file. With one it resolves
    /// the closure and returns the listing file written next to the artifact.
    pub async fn get(
        &self,
        name: &str,
        version: &str,
        scope: Option<Scope>,
    ) -> miette::Result<Fetched> {
        let coord = Coordinate::from_name(name, version).ok_or_else(|| DepotError::Config {
            message: format!("Expected group+artifact, got `{name}`"),
        })?;
        let entry = self.registry.get_entry(&coord)?;
        let Some(root) = entry
            .resolve_descriptor(&self.registry, self.engine.repositories())
            .await?
        else {
            return Err(DepotError::NotFound {
                coordinate: coord.to_string(),
            }
            .into());
        };

        let Some(scope) = scope else {
            return Ok(Fetched {
                path: entry.resolve_artifact().await?,
                diagnostics: Vec::new(),
            });
        };

        let resolution = self.engine.resolve(&root, scope).await;
        let listing = render_listing(&root, &resolution.dependencies);
        let path = write_listing(
            &entry,
            scope,
            &listing,
            self.registry.settings().lock_timeout,
        )
        .await?;
        Ok(Fetched {
            path,
            diagnostics: resolution.diagnostics,
        })
    }
}
