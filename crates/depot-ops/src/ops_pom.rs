//! Operation: read a project POM with its parents applied.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use depot_maven::descriptor::Descriptor;

use crate::Session;

pub async fn pom(session: &Session, path: &Path) -> miette::Result<Arc<Descriptor>> {
    session
        .registry
        .project_descriptor(path, &session.repos)
        .await
}

/// Human-readable summary: header, parents, dependencies.
pub fn describe(descriptor: &Descriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", descriptor.coordinate());
    if !descriptor.name.is_empty() {
        let _ = writeln!(out, "  name:      {}", descriptor.name);
    }
    let _ = writeln!(out, "  packaging: {}", descriptor.packaging);
    for ancestor in &descriptor.ancestors {
        let _ = writeln!(out, "  parent:    {}", ancestor.coordinate());
    }
    if !descriptor.dependencies.is_empty() {
        let _ = writeln!(out, "  dependencies:");
        for dep in &descriptor.dependencies {
            let optional = if dep.optional { " (optional)" } else { "" };
            let _ = writeln!(out, "    {dep} [{}]{optional}", dep.scope);
        }
    }
    out
}
