//! Operation: fetch an artifact file or write a dependency listing.

use depot_core::coordinate::Coordinate;
use depot_core::scope::Scope;
use depot_resolver::remote::{Fetched, RemoteResolver};
use depot_util::errors::DepotError;

use crate::Session;

/// Split `input` into a `group+artifact` name and a version.
///
/// Accepts `group:artifact:version`, or `group+artifact` with the version
/// given separately. An explicit `version` wins over the one in `input`.
pub fn name_and_version(input: &str, version: Option<&str>) -> miette::Result<(String, String)> {
    if let Some(coord) = Coordinate::parse(input) {
        let version = version
            .map(str::to_string)
            .or(coord.version.clone())
            .ok_or_else(|| DepotError::VersionNotSet {
                coordinate: coord.to_string(),
            })?;
        return Ok((coord.name(), version));
    }
    if input.contains('+') {
        let version = version.ok_or_else(|| DepotError::VersionNotSet {
            coordinate: input.to_string(),
        })?;
        return Ok((input.to_string(), version.to_string()));
    }
    Err(DepotError::Config {
        message: format!("Expected group:artifact:version or group+artifact, got `{input}`"),
    }
    .into())
}

pub async fn fetch(
    session: &Session,
    input: &str,
    version: Option<&str>,
    scope: Option<Scope>,
) -> miette::Result<Fetched> {
    let (name, version) = name_and_version(input, version)?;
    let resolver = RemoteResolver::new(session.registry.clone(), session.repos.clone())
        .with_environment(session.env.clone());
    resolver.get(&name, &version, scope).await
}
