use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scope::Scope;

/// Maven Central base URL, used when no repository is configured.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2/";

/// Global user configuration loaded from `~/.depot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Named remote repositories, tried in name order.
    #[serde(default)]
    pub repositories: BTreeMap<String, String>,
}

/// Local cache settings from `[cache]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    #[serde(default = "default_lock_timeout", rename = "lock-timeout-secs")]
    pub lock_timeout_secs: u64,
    #[serde(default = "default_lock_timeout", rename = "stale-lock-secs")]
    pub stale_lock_secs: u64,
    /// Cached files smaller than this are treated as truncated downloads.
    #[serde(default = "default_min_file_size", rename = "min-file-size")]
    pub min_file_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            lock_timeout_secs: default_lock_timeout(),
            stale_lock_secs: default_lock_timeout(),
            min_file_size: default_min_file_size(),
        }
    }
}

impl CacheConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn stale_lock_after(&self) -> Duration {
        Duration::from_secs(self.stale_lock_secs)
    }

    /// The cache directory with a leading `~` expanded.
    pub fn dir_path(&self) -> PathBuf {
        expand_home(&self.dir)
    }
}

fn default_cache_dir() -> String {
    "~/.depot/repository".to_string()
}

fn default_lock_timeout() -> u64 {
    300
}

fn default_min_file_size() -> u64 {
    100
}

/// Resolver settings from `[resolver]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Background artifact downloads allowed to run at once; 0 runs them inline.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default, rename = "default-scope")]
    pub default_scope: Scope,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            default_scope: Scope::Compile,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            depot_util::errors::DepotError::Config {
                message: format!("Failed to read {}: {e}", path.display()),
            }
        })?;
        toml::from_str(&content).map_err(|e| {
            depot_util::errors::DepotError::Config {
                message: format!("Failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Configured repository URLs, or Maven Central when none are set.
    pub fn repository_urls(&self) -> Vec<String> {
        if self.repositories.is_empty() {
            vec![MAVEN_CENTRAL_URL.to_string()]
        } else {
            self.repositories.values().cloned().collect()
        }
    }
}

/// Returns the depot data directory: `$DEPOT_HOME`, else `~/.depot/`.
pub fn dirs_path() -> PathBuf {
    if let Ok(home) = std::env::var("DEPOT_HOME") {
        return PathBuf::from(home);
    }
    home_dir().join(".depot")
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if path == "~" => home_dir(),
        None => PathBuf::from(path),
    }
}
