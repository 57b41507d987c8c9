use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maven dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Runtime,
    System,
    Import,
    Provided,
    Test,
}

/// A scope string that is not one of the six Maven scopes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown dependency scope `{0}` (expected compile, runtime, system, import, provided or test)")]
pub struct ScopeParseError(pub String);

impl Scope {
    pub const ALL: [Scope; 6] = [
        Scope::Compile,
        Scope::Runtime,
        Scope::System,
        Scope::Import,
        Scope::Provided,
        Scope::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::System => "system",
            Scope::Import => "import",
            Scope::Provided => "provided",
            Scope::Test => "test",
        }
    }
}

impl FromStr for Scope {
    type Err = ScopeParseError;

    /// Scope names are matched exactly after trimming surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str() == trimmed)
            .ok_or_else(|| ScopeParseError(trimmed.to_string()))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
