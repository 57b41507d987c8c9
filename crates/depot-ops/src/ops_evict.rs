//! Operation: drop coordinates from the local cache.

use depot_core::coordinate::Coordinate;
use depot_util::errors::DepotError;
use depot_util::fs::dir_size;

use crate::Session;

/// Result of evicting one coordinate.
#[derive(Debug, PartialEq, Eq)]
pub enum EvictResult {
    /// Removed, with the number of bytes freed.
    Evicted(Coordinate, u64),
    NotCached(Coordinate),
}

/// Evict each of `coords` (`group:artifact:version`), stopping at the first failure.
pub async fn evict(session: &Session, coords: &[String]) -> miette::Result<Vec<EvictResult>> {
    let mut results = Vec::with_capacity(coords.len());
    for input in coords {
        let coord = Coordinate::parse(input).ok_or_else(|| DepotError::Config {
            message: format!("Expected group:artifact:version, got `{input}`"),
        })?;
        let size = dir_size(session.registry.get_entry(&coord)?.dir());
        if session.registry.evict(&coord).await? {
            results.push(EvictResult::Evicted(coord, size));
        } else {
            results.push(EvictResult::NotCached(coord));
        }
    }
    Ok(results)
}
