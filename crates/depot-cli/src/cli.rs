//! CLI argument definitions for depot.
//!
//! Uses `clap` derive macros. Each command corresponds to a handler in the
//! [`super::commands`] module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use depot_core::scope::Scope;

#[derive(Parser, Debug)]
#[command(
    name = "depot",
    version,
    about = "Resolve Maven artifacts through a verified local repository cache",
    long_about = "depot downloads POMs and JARs from remote Maven repositories, verifies \
                  them against published checksums, caches them locally and computes \
                  transitive dependency closures."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Remote repository URI or directory, in lookup order (repeatable)
    #[arg(long = "repo", global = true, value_name = "URI")]
    pub repos: Vec<String>,

    /// Local repository cache directory
    #[arg(long, global = true, env = "DEPOT_CACHE", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Background download workers (0 downloads inline)
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Define a macro value used when no POM sets it, e.g. -D jdk.version=17
    #[arg(short = 'D', long = "define", global = true, value_name = "KEY=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,
}

fn parse_define(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the transitive dependencies of a coordinate or project POM
    Resolve {
        /// group:artifact:version, or a path to a pom.xml or its directory
        target: String,
        /// Dependency scope to follow
        #[arg(short, long)]
        scope: Option<Scope>,
        /// Write the listing to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print a JSON report
        #[arg(long)]
        json: bool,
        /// Fail if any dependency could not be resolved
        #[arg(long)]
        strict: bool,
    },

    /// Download an artifact, or write its dependency listing into the cache
    Fetch {
        /// group:artifact:version or group+artifact
        coordinate: String,
        /// Version, required with the group+artifact form
        #[arg(long)]
        version: Option<String>,
        /// Write the dependency listing for this scope instead
        #[arg(short, long)]
        scope: Option<Scope>,
    },

    /// Show a project POM with its parents applied
    Pom {
        /// Path to a pom.xml or its directory
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Print the descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove coordinates from the local cache
    Evict {
        /// group:artifact:version
        #[arg(required = true)]
        coordinates: Vec<String>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
