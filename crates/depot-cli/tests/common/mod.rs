#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use depot_util::hash::md5_bytes;
use tempfile::TempDir;

/// A file repository, a cache and an isolated depot home for one test.
pub struct Sandbox {
    pub remote: TempDir,
    pub cache: TempDir,
    pub home: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            remote: TempDir::new().unwrap(),
            cache: TempDir::new().unwrap(),
            home: TempDir::new().unwrap(),
        }
    }

    /// `depot` pointed at this sandbox's repository and cache.
    pub fn depot(&self) -> Command {
        let mut cmd = Command::cargo_bin("depot").unwrap();
        cmd.env("DEPOT_HOME", self.home.path())
            .env_remove("DEPOT_CACHE")
            .env_remove("RUST_LOG")
            .arg("--repo")
            .arg(self.remote.path())
            .arg("--cache-dir")
            .arg(self.cache.path())
            .arg("--workers")
            .arg("0");
        cmd
    }

    fn put(&self, path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
        let mut sidecar = path.file_name().unwrap().to_os_string();
        sidecar.push(".md5");
        std::fs::write(path.with_file_name(sidecar), md5_bytes(data)).unwrap();
    }

    fn remote_file(&self, group: &str, artifact: &str, version: &str, ext: &str) -> PathBuf {
        self.remote
            .path()
            .join(group.replace('.', "/"))
            .join(artifact)
            .join(version)
            .join(format!("{artifact}-{version}.{ext}"))
    }

    /// Publish a POM and a JAR; `deps` are `group:artifact:version` strings.
    pub fn publish(&self, group: &str, artifact: &str, version: &str, deps: &[&str]) {
        let xml = pom_xml(group, artifact, version, deps);
        self.put(&self.remote_file(group, artifact, version, "pom"), xml.as_bytes());
        let mut jar = b"PK\x03\x04".to_vec();
        jar.resize(512, b'.');
        self.put(&self.remote_file(group, artifact, version, "jar"), &jar);
    }

    pub fn cached(&self, relative: &str) -> PathBuf {
        self.cache.path().join(relative)
    }
}

pub fn pom_xml(group: &str, artifact: &str, version: &str, deps: &[&str]) -> String {
    let mut xml = format!(
        "<project>\n  <groupId>{group}</groupId>\n  <artifactId>{artifact}</artifactId>\n  <version>{version}</version>\n  <dependencies>\n"
    );
    for dep in deps {
        let parts: Vec<&str> = dep.split(':').collect();
        xml.push_str(&format!(
            "    <dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version></dependency>\n",
            parts[0], parts[1], parts[2]
        ));
    }
    xml.push_str(&format!("  </dependencies>\n  <!-- {} -->\n</project>\n", ".".repeat(128)));
    xml
}
