//! Command dispatch and handler modules.

mod evict;
mod fetch;
mod pom;
mod resolve;

use miette::Result;

use depot_core::config::GlobalConfig;
use depot_ops::{Overrides, Session};

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config_path = GlobalConfig::default_path();
    tracing::debug!("reading configuration from {}", config_path.display());
    let config = GlobalConfig::load_from(&config_path)?;
    let overrides = Overrides {
        cache_dir: cli.global.cache_dir,
        workers: cli.global.workers,
        repositories: cli.global.repos,
        defines: cli.global.defines.into_iter().collect(),
    };
    let session = Session::open(config, &overrides)?;

    let result = match cli.command {
        Command::Resolve {
            target,
            scope,
            output,
            json,
            strict,
        } => resolve::exec(&session, &target, scope, output.as_deref(), json, strict).await,
        Command::Fetch {
            coordinate,
            version,
            scope,
        } => fetch::exec(&session, &coordinate, version.as_deref(), scope).await,
        Command::Pom { path, json } => pom::exec(&session, &path, json).await,
        Command::Evict { coordinates } => evict::exec(&session, &coordinates).await,
    };

    session.close().await;
    result
}
