//! Handler for `depot fetch`.

use miette::Result;

use depot_core::scope::Scope;
use depot_ops::ops_fetch;
use depot_ops::Session;
use depot_util::progress::{spinner, status_warn};

pub async fn exec(
    session: &Session,
    coordinate: &str,
    version: Option<&str>,
    scope: Option<Scope>,
) -> Result<()> {
    let sp = spinner(&format!("Fetching {coordinate}..."));
    let fetched = ops_fetch::fetch(session, coordinate, version, scope).await;
    sp.finish_and_clear();
    let fetched = fetched?;

    for diagnostic in &fetched.diagnostics {
        status_warn("warning", &diagnostic.message);
    }
    println!("{}", fetched.path.display());
    Ok(())
}
