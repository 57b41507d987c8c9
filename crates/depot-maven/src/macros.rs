//! `${...}` macro expansion over descriptors and the process environment.

use depot_core::properties::Environment;
use depot_core::report::Reporter;

/// Result of substituting a missing value.
pub const UNDEFINED: &str = "<<???>>";

/// Maximum nesting of macro expansions before giving up.
pub const MAX_DEPTH: usize = 20;

/// Something that can answer a macro name, e.g. a descriptor's built-ins and properties.
pub trait MacroSource {
    fn resolve_macro(&self, key: &str) -> Option<String>;
}

/// Expands `${...}` tokens against an ordered list of sources, then the environment.
///
/// Unresolved tokens are left in place and reported as warnings. Expansion
/// never fails; problems only ever reach the reporter.
pub struct Substitutor<'a> {
    sources: Vec<&'a dyn MacroSource>,
    env: &'a dyn Environment,
    reporter: &'a dyn Reporter,
}

impl<'a> Substitutor<'a> {
    pub fn new(env: &'a dyn Environment, reporter: &'a dyn Reporter) -> Self {
        Self {
            sources: Vec::new(),
            env,
            reporter,
        }
    }

    /// Add a lookup scope; earlier scopes win.
    pub fn source(mut self, source: &'a dyn MacroSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Expand every macro in `raw`.
    ///
    /// A `None` input yields [`UNDEFINED`] and an error diagnostic.
    pub fn substitute(&self, raw: Option<&str>) -> String {
        match raw {
            Some(raw) => self.process(raw, 0),
            None => {
                self.reporter.error("Cannot substitute an undefined value");
                UNDEFINED.to_string()
            }
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.sources
            .iter()
            .find_map(|s| s.resolve_macro(key))
            .or_else(|| self.env.var(key))
    }

    fn process(&self, input: &str, depth: usize) -> String {
        if !input.contains("${") {
            return input.to_string();
        }
        if depth >= MAX_DEPTH {
            self.reporter
                .error(&format!("Macro nesting deeper than {MAX_DEPTH} in {input}"));
            return input.to_string();
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let body = &rest[start + 2..];
            let Some(end) = matching_brace(body) else {
                // Unterminated token: keep the tail as is.
                out.push_str(&rest[start..]);
                return out;
            };
            let key = self.process(&body[..end], depth + 1);
            match self.lookup(key.trim()) {
                Some(value) => out.push_str(&self.process(&value, depth + 1)),
                None => {
                    self.reporter
                        .warning(&format!("No translation found for macro: ${{{key}}}"));
                    out.push_str("${");
                    out.push_str(&key);
                    out.push('}');
                }
            }
            rest = &body[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// Index of the `}` closing a token whose body starts at `body[0]`, honoring nested `${`.
fn matching_brace(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 1;
            }
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}
