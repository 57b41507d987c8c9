use std::fmt;

use serde::{Deserialize, Serialize};

/// Display form of a coordinate whose version is unspecified.
pub const VERSION_NOT_SET: &str = "<not set>";

/// Maven coordinates: group, artifact and a version or version range.
///
/// Equality and cache keying follow the `group/artifact/version` string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    pub version: Option<String>,
}

impl Coordinate {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>, version: &str) -> Self {
        let version = version.trim();
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: (!version.is_empty()).then(|| version.to_string()),
        }
    }

    /// Parse `"group:artifact:version"` into coordinates.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [group, artifact, version] if !group.is_empty() && !artifact.is_empty() => {
                Some(Self::new(*group, *artifact, version))
            }
            _ => None,
        }
    }

    /// Parse the `"group+artifact"` name form together with a separate version.
    pub fn from_name(name: &str, version: &str) -> Option<Self> {
        let (group, artifact) = name.split_once('+')?;
        if group.is_empty() || artifact.is_empty() {
            return None;
        }
        Some(Self::new(group, artifact, version))
    }

    /// The version, or [`VERSION_NOT_SET`] when unspecified.
    pub fn version_or_unset(&self) -> &str {
        self.version.as_deref().unwrap_or(VERSION_NOT_SET)
    }

    /// `group+artifact`, the key used by exclusion sets and listings.
    pub fn name(&self) -> String {
        format!("{}+{}", self.group, self.artifact)
    }

    /// `group/artifact/version` cache key; `None` when the version is unset.
    pub fn key(&self) -> Option<String> {
        let version = self.version.as_deref()?;
        Some(format!("{}/{}/{}", self.group, self.artifact, version))
    }

    /// Repository layout directory, e.g. `org/example/lib/1.0`.
    ///
    /// `None` when the version is unset: such coordinates are never cached.
    pub fn path(&self) -> Option<String> {
        let version = self.version.as_deref()?;
        Some(format!(
            "{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            version
        ))
    }

    /// Whether every component maps to exactly one plain directory name, so
    /// [`path`](Self::path) stays below whatever root it is joined onto.
    pub fn is_path_safe(&self) -> bool {
        let group_ok = self.group.split('.').all(plain_component);
        let version_ok = self.version.as_deref().map_or(true, plain_component);
        group_ok && plain_component(&self.artifact) && version_ok
    }

    /// File name inside the layout directory, e.g. `lib-1.0.pom`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}-{}.{extension}", self.artifact, self.version_or_unset())
    }
}

fn plain_component(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && !s.contains(|c: char| matches!(c, '/' | '\\' | ':' | '\0'))
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.group,
            self.artifact,
            self.version_or_unset()
        )
    }
}
