#![allow(dead_code)]

use std::path::{Path, PathBuf};

use depot_maven::download::{build_client, Fetcher};
use depot_maven::registry::{Registry, RegistrySettings};
use depot_maven::repository::RemoteRepository;
use depot_util::hash::{md5_bytes, sha1_bytes};
use tempfile::TempDir;

/// A `file:` repository in Maven layout, built on the fly.
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

    /// Write `data` plus an `.md5` sidecar.
    pub fn put(&self, path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
        std::fs::write(sidecar(path, "md5"), md5_bytes(data)).unwrap();
    }

    /// Publish a POM and a JAR, both with checksums.
    pub fn publish(&self, group: &str, artifact: &str, version: &str, deps: &[Dep]) -> PathBuf {
        self.publish_pom(group, artifact, version, &pom_xml(group, artifact, version, deps));
        let jar = self.file(group, artifact, version, "jar");
        self.put(&jar, &jar_bytes(artifact));
        jar
    }

    pub fn publish_pom(&self, group: &str, artifact: &str, version: &str, xml: &str) -> PathBuf {
        let pom = self.file(group, artifact, version, "pom");
        self.put(&pom, xml.as_bytes());
        pom
    }

    pub fn pom_path(&self, group: &str, artifact: &str, version: &str) -> PathBuf {
        self.file(group, artifact, version, "pom")
    }

    pub fn jar_path(&self, group: &str, artifact: &str, version: &str) -> PathBuf {
        self.file(group, artifact, version, "jar")
    }

    /// Replace the `.md5` sidecar of `path` with a `.sha1` one.
    pub fn switch_to_sha1(&self, path: &Path) {
        let data = std::fs::read(path).unwrap();
        std::fs::remove_file(sidecar(path, "md5")).unwrap();
        std::fs::write(sidecar(path, "sha1"), sha1_bytes(&data)).unwrap();
    }
}

pub fn sidecar(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.file_name().unwrap().to_os_string();
    name.push(format!(".{ext}"));
    path.with_file_name(name)
}

/// A dependency line for [`pom_xml`].
#[derive(Clone, Copy)]
pub struct Dep<'a> {
    pub group: &'a str,
    pub artifact: &'a str,
    pub version: &'a str,
    pub scope: Option<&'a str>,
    pub optional: bool,
    pub exclusions: &'a [(&'a str, &'a str)],
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

pub fn pom_xml(group: &str, artifact: &str, version: &str, deps: &[Dep]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <project xmlns=\"http://maven.apache.org/POM/4.0.0\">\n\
         \x20 <modelVersion>4.0.0</modelVersion>\n\
         \x20 <groupId>{group}</groupId>\n\
         \x20 <artifactId>{artifact}</artifactId>\n\
         \x20 <version>{version}</version>\n\
         \x20 <dependencies>\n"
    );
    for d in deps {
        xml.push_str(&format!(
            "    <dependency>\n      <groupId>{}</groupId>\n      <artifactId>{}</artifactId>\n      <version>{}</version>\n",
            d.group, d.artifact, d.version
        ));
        if let Some(scope) = d.scope {
            xml.push_str(&format!("      <scope>{scope}</scope>\n"));
        }
        if d.optional {
            xml.push_str("      <optional>true</optional>\n");
        }
        if !d.exclusions.is_empty() {
            xml.push_str("      <exclusions>\n");
            for (g, a) in d.exclusions {
                xml.push_str(&format!(
                    "        <exclusion><groupId>{g}</groupId><artifactId>{a}</artifactId></exclusion>\n"
                ));
            }
            xml.push_str("      </exclusions>\n");
        }
        xml.push_str("    </dependency>\n");
    }
    xml.push_str("  </dependencies>\n</project>\n");
    xml
}

pub fn jar_bytes(artifact: &str) -> Vec<u8> {
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.extend(std::iter::repeat(artifact.as_bytes()).take(64).flatten());
    bytes.resize(bytes.len().max(256), b'.');
    bytes
}

pub fn registry(cache: &Path, workers: usize) -> Registry {
    let settings = RegistrySettings {
        workers,
        ..RegistrySettings::default()
    };
    Registry::new(cache, Fetcher::new(build_client().unwrap()), settings)
}
