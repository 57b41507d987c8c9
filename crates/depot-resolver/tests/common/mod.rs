#![allow(dead_code)]

use std::path::{Path, PathBuf};

use depot_maven::download::{build_client, Fetcher};
use depot_maven::registry::{Registry, RegistrySettings};
use depot_maven::repository::RemoteRepository;
use depot_util::hash::md5_bytes;
use tempfile::TempDir;

/// A `file:` repository in Maven layout.
pub struct RepoFixture {
    pub dir: TempDir,
}

impl RepoFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn repo(&self) -> RemoteRepository {
        RemoteRepository::from_dir(self.dir.path()).unwrap()
    }

    fn file(&self, group: &str, artifact: &str, version: &str, ext: &str) -> PathBuf {
        self.dir
            .path()
            .join(group.replace('.', "/"))
            .join(artifact)
            .join(version)
            .join(format!("{artifact}-{version}.{ext}"))
    }

    fn put(&self, path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
        let mut sidecar = path.file_name().unwrap().to_os_string();
        sidecar.push(".md5");
        std::fs::write(path.with_file_name(sidecar), md5_bytes(data)).unwrap();
    }

    pub fn publish(&self, group: &str, artifact: &str, version: &str, deps: &[Dep]) {
        self.publish_pom(group, artifact, version, &pom_xml(group, artifact, version, "", deps));
        let mut jar = b"PK\x03\x04".to_vec();
        jar.resize(512, b'.');
        self.put(&self.file(group, artifact, version, "jar"), &jar);
    }

    pub fn publish_pom(&self, group: &str, artifact: &str, version: &str, xml: &str) {
        self.put(&self.file(group, artifact, version, "pom"), xml.as_bytes());
    }
}

#[derive(Clone, Copy)]
pub struct Dep<'a> {
    pub group: &'a str,
    pub artifact: &'a str,
    pub version: &'a str,
    pub scope: Option<&'a str>,
    pub optional: bool,
    pub exclusions: &'a [(&'a str, &'a str)],
}

impl<'a> Dep<'a> {
    pub fn scope(mut self, scope: &'a str) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn excluding(mut self, exclusions: &'a [(&'a str, &'a str)]) -> Self {
        self.exclusions = exclusions;
        self
    }
}

pub fn dep<'a>(group: &'a str, artifact: &'a str, version: &'a str) -> Dep<'a> {
    Dep {
        group,
        artifact,
        version,
        scope: None,
        optional: false,
        exclusions: &[],
    }
}

/// A POM with `extra` spliced in after the header (e.g. a `<properties>` block).
pub fn pom_xml(group: &str, artifact: &str, version: &str, extra: &str, deps: &[Dep]) -> String {
    let mut xml = format!(
        "<project>\n  <groupId>{group}</groupId>\n  <artifactId>{artifact}</artifactId>\n  <version>{version}</version>\n{extra}\n  <dependencies>\n"
    );
    for d in deps {
        xml.push_str(&format!(
            "    <dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>",
            d.group, d.artifact, d.version
        ));
        if let Some(scope) = d.scope {
            xml.push_str(&format!("<scope>{scope}</scope>"));
        }
        if d.optional {
            xml.push_str("<optional>true</optional>");
        }
        if !d.exclusions.is_empty() {
            xml.push_str("<exclusions>");
            for (g, a) in d.exclusions {
                xml.push_str(&format!(
                    "<exclusion><groupId>{g}</groupId><artifactId>{a}</artifactId></exclusion>"
                ));
            }
            xml.push_str("</exclusions>");
        }
        xml.push_str("</dependency>\n");
    }
    // padding keeps tiny POMs above the minimum cached file size
    xml.push_str(&format!("  </dependencies>\n  <!-- {} -->\n</project>\n", ".".repeat(128)));
    xml
}

pub fn registry(cache: &Path) -> Registry {
    let settings = RegistrySettings {
        workers: 0,
        ..RegistrySettings::default()
    };
    Registry::new(cache, Fetcher::new(build_client().unwrap()), settings)
}
