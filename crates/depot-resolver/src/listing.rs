//! Dependency listing files: one `group+artifact;version="x"` line per artifact.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use depot_core::scope::Scope;
use depot_maven::descriptor::Descriptor;
use depot_maven::entry::CacheEntry;

/// A single listing line for `descriptor`.
pub fn listing_line(descriptor: &Descriptor) -> String {
    format!(
        "{}+{};version=\"{}\"",
        descriptor.group_id, descriptor.artifact_id, descriptor.version
    )
}

/// Render `root` followed by its closure, one line each.
pub fn render_listing(root: &Descriptor, dependencies: &[Arc<Descriptor>]) -> String {
    let mut out = listing_line(root);
    out.push('\n');
    for dep in dependencies {
        out.push_str(&listing_line(dep));
        out.push('\n');
    }
    out
}

/// Write the listing for `scope` into `entry`'s directory.
pub async fn write_listing(
    entry: &CacheEntry,
    scope: Scope,
    content: &str,
    lock_timeout: Duration,
) -> miette::Result<PathBuf> {
    let path = entry.listing_path(scope.as_str());
    entry.store(&path, content.as_bytes(), lock_timeout).await?;
    tracing::debug!("wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_maven::pom::parse_pom;

    fn descriptor(group: &str, artifact: &str, version: &str) -> Arc<Descriptor> {
        let xml = format!(
            "<project><groupId>{group}</groupId><artifactId>{artifact}</artifactId><version>{version}</version></project>"
        );
        Arc::new(Descriptor::inherit(parse_pom(&xml).unwrap(), None, None, None).unwrap())
    }

    #[test]
    fn root_line_comes_first() {
        let root = descriptor("org.example", "app", "1.0");
        let deps = vec![descriptor("g", "a", "1.0"), descriptor("g", "b", "2.0")];
        assert_eq!(
            render_listing(&root, &deps),
            "org.example+app;version=\"1.0\"\ng+a;version=\"1.0\"\ng+b;version=\"2.0\"\n"
        );
    }
}
