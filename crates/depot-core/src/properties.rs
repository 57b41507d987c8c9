//! Property tables: environment lookup for macro expansion and the
//! `key=value` properties file format used by cache side-files.

use std::collections::BTreeMap;
use std::path::Path;

/// Fallback lookup for macro tokens that no descriptor binds.
///
/// Injected explicitly wherever substitution happens, so tests and embedders
/// control exactly what the process environment contributes.
pub trait Environment: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed set of overrides, optionally falling back to the process environment.
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    values: BTreeMap<String, String>,
    inherit: bool,
}

impl MapEnvironment {
    /// Only the given values; the process environment is not consulted.
    pub fn isolated(values: BTreeMap<String, String>) -> Self {
        Self {
            values,
            inherit: false,
        }
    }

    /// The given values first, then the process environment.
    pub fn with_process(values: BTreeMap<String, String>) -> Self {
        Self {
            values,
            inherit: true,
        }
    }
}

impl Environment for MapEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| self.inherit.then(|| std::env::var(key).ok()).flatten())
    }
}

/// Load a properties file; a missing file yields an empty table.
pub fn load_properties(path: &Path) -> miette::Result<BTreeMap<String, String>> {
    if !path.is_file() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(depot_util::errors::DepotError::Io)?;
    Ok(parse_properties(&content))
}

/// Parse `key=value` lines (`:` is also accepted as separator).
///
/// Blank lines and lines starting with `#` or `!` are skipped. Backslash
/// escapes in keys and values are undone.
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let (key, value) = split_unescaped(trimmed);
        map.insert(unescape(key.trim_end()), unescape(value.trim_start()));
    }
    map
}

/// Render a table as properties text, one sorted `key=value` line per entry.
pub fn render_properties(map: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in map {
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(value, false));
        out.push('\n');
    }
    out
}

fn split_unescaped(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], &line[i + 1..]),
            _ => {}
        }
    }
    (line, "")
}

fn escape(s: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '=' | ':' | ' ' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
