//! Handler for `depot resolve`.

use std::path::Path;

use miette::Result;

use depot_core::scope::Scope;
use depot_ops::ops_resolve::{self, Target};
use depot_ops::Session;
use depot_util::errors::DepotError;
use depot_util::progress::{spinner, status, status_error, status_warn};

pub async fn exec(
    session: &Session,
    target: &str,
    scope: Option<Scope>,
    output: Option<&Path>,
    json: bool,
    strict: bool,
) -> Result<()> {
    let target = Target::parse(target)?;
    let scope = scope.unwrap_or_else(|| session.default_scope());

    let sp = spinner("Resolving dependencies...");
    let outcome = ops_resolve::resolve(session, &target, scope).await;
    sp.finish_and_clear();
    let outcome = outcome?;

    for diagnostic in &outcome.resolution.diagnostics {
        if strict {
            status_error("error", &diagnostic.message);
        } else {
            status_warn("warning", &diagnostic.message);
        }
    }

    let rendered = if json {
        let mut text = serde_json::to_string_pretty(&outcome.report()).map_err(|e| {
            DepotError::Generic {
                message: format!("Failed to serialize report: {e}"),
            }
        })?;
        text.push('\n');
        text
    } else {
        outcome.listing()
    };

    match output {
        Some(path) => {
            depot_util::fs::atomic_write(path, rendered.as_bytes()).map_err(DepotError::Io)?;
            status(
                "Resolved",
                &format!(
                    "{} dependencies of {} into {}",
                    outcome.resolution.dependencies.len(),
                    outcome.root.coordinate(),
                    path.display()
                ),
            );
        }
        None => print!("{rendered}"),
    }

    if strict && !outcome.resolution.is_clean() {
        return Err(DepotError::Generic {
            message: format!(
                "{} dependencies of {} could not be resolved",
                outcome.resolution.diagnostics.len(),
                outcome.root.coordinate()
            ),
        }
        .into());
    }
    Ok(())
}
