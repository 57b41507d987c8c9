//! Handler for `depot pom`.

use std::path::Path;

use miette::Result;

use depot_ops::ops_pom;
use depot_ops::Session;
use depot_util::errors::DepotError;

pub async fn exec(session: &Session, path: &Path, json: bool) -> Result<()> {
    let descriptor = ops_pom::pom(session, path).await?;
    if json {
        let text = serde_json::to_string_pretty(&*descriptor).map_err(|e| DepotError::Generic {
            message: format!("Failed to serialize descriptor: {e}"),
        })?;
        println!("{text}");
    } else {
        print!("{}", ops_pom::describe(&descriptor));
    }
    Ok(())
}
