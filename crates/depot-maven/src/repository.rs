//! Remote repository base URIs and the Maven file layout beneath them.

use std::fmt;
use std::path::Path;

use depot_core::coordinate::Coordinate;
use reqwest::Url;

/// A remote (or file-backed) Maven repository.
///
/// The base URI is normalized to end in exactly one `/`; that normalized
/// string is the repository's identity in ledgers and provenance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteRepository {
    base: String,
}

impl RemoteRepository {
    /// Parse an `http`, `https` or `file` URI, or a plain directory path.
    pub fn parse(input: &str) -> miette::Result<Self> {
        let input = input.trim();
        if input.contains("://") || input.starts_with("file:") {
            let url = Url::parse(input).map_err(|e| depot_util::errors::DepotError::Config {
                message: format!("Invalid repository URI `{input}`: {e}"),
            })?;
            match url.scheme() {
                "http" | "https" | "file" => Ok(Self::from_base(url.as_str())),
                other => Err(depot_util::errors::DepotError::Config {
                    message: format!("Unsupported repository scheme `{other}` in `{input}`"),
                }
                .into()),
            }
        } else {
            Self::from_dir(Path::new(input))
        }
    }

    /// A repository backed by a local directory in Maven layout.
    pub fn from_dir(dir: &Path) -> miette::Result<Self> {
        let abs = std::path::absolute(dir).map_err(depot_util::errors::DepotError::Io)?;
        let url = Url::from_directory_path(&abs).map_err(|_| {
            depot_util::errors::DepotError::Config {
                message: format!("Cannot turn {} into a file: URI", abs.display()),
            }
        })?;
        Ok(Self::from_base(url.as_str()))
    }

    fn from_base(base: &str) -> Self {
        Self {
            base: format!("{}/", base.trim_end_matches('/')),
        }
    }

    /// The normalized base URI, always ending in `/`.
    pub fn url(&self) -> &str {
        &self.base
    }

    pub fn is_file(&self) -> bool {
        self.base.starts_with("file:")
    }

    /// Full URI for a path relative to the repository root.
    pub fn file_url(&self, relative: &str) -> String {
        format!("{}{}", self.base, relative.trim_start_matches('/'))
    }

    /// Relative path of the POM for a coordinate, e.g. `org/x/lib/1.0/lib-1.0.pom`.
    pub fn pom_path(coord: &Coordinate) -> Option<String> {
        Some(format!("{}/{}", coord.path()?, coord.file_name("pom")))
    }

    /// Relative path of the JAR for a coordinate.
    pub fn jar_path(coord: &Coordinate) -> Option<String> {
        Some(format!("{}/{}", coord.path()?, coord.file_name("jar")))
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// Parse an ordered list of repository URIs, dropping duplicates.
pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> miette::Result<Vec<RemoteRepository>> {
    let mut repos: Vec<RemoteRepository> = Vec::new();
    for input in inputs {
        let repo = RemoteRepository::parse(input.as_ref())?;
        if !repos.contains(&repo) {
            repos.push(repo);
        }
    }
    Ok(repos)
}
