//! Operation: compute the transitive closure of a coordinate or project POM.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use depot_core::coordinate::Coordinate;
use depot_core::report::Diagnostic;
use depot_core::scope::Scope;
use depot_maven::descriptor::Descriptor;
use depot_resolver::closure::{ClosureEngine, Resolution};
use depot_resolver::listing::render_listing;
use depot_util::errors::DepotError;

use crate::Session;

/// What to resolve: a cached coordinate or a POM on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Coordinate(Coordinate),
    Project(PathBuf),
}

impl Target {
    /// Existing paths are projects; anything else must be `group:artifact:version`.
    pub fn parse(input: &str) -> miette::Result<Self> {
        let path = Path::new(input);
        if path.exists() {
            return Ok(Target::Project(path.to_path_buf()));
        }
        Coordinate::parse(input)
            .map(Target::Coordinate)
            .ok_or_else(|| {
                DepotError::Config {
                    message: format!(
                        "`{input}` is neither group:artifact:version nor an existing POM path"
                    ),
                }
                .into()
            })
    }
}

pub struct ResolveOutcome {
    pub root: Arc<Descriptor>,
    pub scope: Scope,
    pub resolution: Resolution,
}

/// JSON form of a [`ResolveOutcome`].
#[derive(Serialize)]
pub struct ResolveReport {
    pub root: String,
    pub scope: Scope,
    pub dependencies: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolveOutcome {
    /// `group+artifact;version="x"` lines, root first.
    pub fn listing(&self) -> String {
        render_listing(&self.root, &self.resolution.dependencies)
    }

    pub fn report(&self) -> ResolveReport {
        ResolveReport {
            root: self.root.coordinate().to_string(),
            scope: self.scope,
            dependencies: self
                .resolution
                .dependencies
                .iter()
                .map(|d| d.coordinate().to_string())
                .collect(),
            diagnostics: self.resolution.diagnostics.clone(),
        }
    }
}

/// Load the root descriptor for `target`.
pub async fn load_root(session: &Session, target: &Target) -> miette::Result<Arc<Descriptor>> {
    match target {
        Target::Project(path) => {
            session
                .registry
                .project_descriptor(path, &session.repos)
                .await
        }
        Target::Coordinate(coord) => session
            .registry
            .descriptor(coord, &session.repos)
            .await?
            .ok_or_else(|| {
                DepotError::NotFound {
                    coordinate: coord.to_string(),
                }
                .into()
            }),
    }
}

/// Resolve `target` and its dependencies with exactly `scope`.
pub async fn resolve(
    session: &Session,
    target: &Target,
    scope: Scope,
) -> miette::Result<ResolveOutcome> {
    let root = load_root(session, target).await?;
    tracing::info!("resolving {} ({scope})", root.coordinate());
    let engine = ClosureEngine::new(session.registry.clone(), session.repos.clone())
        .with_environment(session.env.clone());
    let resolution = engine.resolve(&root, scope).await;
    Ok(ResolveOutcome {
        root,
        scope,
        resolution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_and_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(
            Target::parse(dir.path().to_str().unwrap()).unwrap(),
            Target::Project(dir.path().to_path_buf())
        );
        assert_eq!(
            Target::parse("org.example:lib:1.0").unwrap(),
            Target::Coordinate(Coordinate::new("org.example", "lib", "1.0"))
        );
        assert!(Target::parse("no/such/pom.xml").is_err());
    }
}
