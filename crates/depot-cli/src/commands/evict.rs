//! Handler for `depot evict`.

use miette::Result;

use depot_ops::ops_evict::{self, EvictResult};
use depot_ops::Session;
use depot_util::progress::{status, status_warn};

pub async fn exec(session: &Session, coordinates: &[String]) -> Result<()> {
    for result in ops_evict::evict(session, coordinates).await? {
        match result {
            EvictResult::Evicted(coord, bytes) => {
                status("Evicted", &format!("{coord} ({bytes} bytes)"))
            }
            EvictResult::NotCached(coord) => {
                status_warn("Skipped", &format!("{coord} is not cached"))
            }
        }
    }
    Ok(())
}
