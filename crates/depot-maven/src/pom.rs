//! POM file parsing: coordinates, parent reference, properties and declared dependencies.
//!
//! This is a purely structural read of the XML. Inheritance and `${...}`
//! substitution happen later in [`crate::descriptor`].

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

/// A parsed POM (Project Object Model) file, before inheritance.
#[derive(Debug, Clone, Default)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,

    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<PomDependency>,
}

/// Reference to a parent POM.
#[derive(Debug, Clone, Default)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub relative_path: Option<String>,
}

/// A dependency declared in a POM file.
#[derive(Debug, Clone, Default)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<PomExclusion>,
}

/// An exclusion within a dependency declaration.
#[derive(Debug, Clone, Default)]
pub struct PomExclusion {
    pub group_id: String,
    pub artifact_id: Option<String>,
}

impl PomExclusion {
    /// `group+artifact`; a missing artifact is written as `*`.
    pub fn name(&self) -> String {
        format!(
            "{}+{}",
            self.group_id.trim(),
            self.artifact_id.as_deref().map(str::trim).unwrap_or("*")
        )
    }
}

/// Parse a POM XML string into a `Pom` struct.
pub fn parse_pom(xml: &str) -> miette::Result<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();
    let mut seen_project = false;

    let mut current_dep: Option<PomDependency> = None;
    let mut current_exclusion: Option<PomExclusion> = None;
    let mut current_parent: Option<ParentRef> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if path.is_empty() {
                    if tag != "project" {
                        return Err(malformed(format!("unexpected root element <{tag}>")));
                    }
                    seen_project = true;
                }
                path.push(tag);
                text_buf.clear();

                match path_context(&path).as_str() {
                    "project>dependencies>dependency" => {
                        current_dep = Some(PomDependency::default());
                    }
                    "project>dependencies>dependency>exclusions>exclusion" => {
                        current_exclusion = Some(PomExclusion::default());
                    }
                    "project>parent" => {
                        current_parent = Some(ParentRef::default());
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if path.is_empty() {
                    if tag != "project" {
                        return Err(malformed(format!("unexpected root element <{tag}>")));
                    }
                    seen_project = true;
                }
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e
                    .unescape()
                    .map_err(|err| malformed(format!("bad text content: {err}")))?
                    .to_string();
            }
            Ok(Event::CData(ref e)) => {
                text_buf = String::from_utf8_lossy(e).to_string();
            }
            Ok(Event::End(_)) => {
                let ctx = path_context(&path);
                let depth = path.len();
                let leaf = path.last().map(|s| s.as_str());

                // <project><properties><key>value</key></properties>
                if depth == 3 && path.get(1).map(|s| s.as_str()) == Some("properties") {
                    if let Some(key) = leaf {
                        pom.properties.insert(key.to_string(), text_buf.clone());
                    }
                }

                if let Some(ref mut excl) = current_exclusion {
                    match ctx.as_str() {
                        "project>dependencies>dependency>exclusions>exclusion>groupId" => {
                            excl.group_id = text_buf.clone();
                        }
                        "project>dependencies>dependency>exclusions>exclusion>artifactId" => {
                            excl.artifact_id = Some(text_buf.clone());
                        }
                        "project>dependencies>dependency>exclusions>exclusion" => {
                            if let (Some(excl), Some(dep)) =
                                (current_exclusion.take(), current_dep.as_mut())
                            {
                                dep.exclusions.push(excl);
                            }
                        }
                        _ => {}
                    }
                } else if let Some(ref mut dep) = current_dep {
                    match ctx.as_str() {
                        "project>dependencies>dependency>groupId" => {
                            dep.group_id = text_buf.clone();
                        }
                        "project>dependencies>dependency>artifactId" => {
                            dep.artifact_id = text_buf.clone();
                        }
                        "project>dependencies>dependency>version" => {
                            dep.version = Some(text_buf.clone());
                        }
                        "project>dependencies>dependency>scope" => {
                            dep.scope = Some(text_buf.clone());
                        }
                        "project>dependencies>dependency>optional" => {
                            dep.optional = text_buf.trim() == "true";
                        }
                        "project>dependencies>dependency" => {
                            if let Some(dep) = current_dep.take() {
                                pom.dependencies.push(dep);
                            }
                        }
                        _ => {}
                    }
                }

                if let Some(ref mut parent) = current_parent {
                    match ctx.as_str() {
                        "project>parent>groupId" => parent.group_id = text_buf.clone(),
                        "project>parent>artifactId" => parent.artifact_id = text_buf.clone(),
                        "project>parent>version" => parent.version = text_buf.clone(),
                        "project>parent>relativePath" => {
                            parent.relative_path = Some(text_buf.clone());
                        }
                        "project>parent" => pom.parent = current_parent.take(),
                        _ => {}
                    }
                }

                if depth == 2 {
                    match leaf {
                        Some("groupId") => pom.group_id = Some(text_buf.clone()),
                        Some("artifactId") => pom.artifact_id = Some(text_buf.clone()),
                        Some("version") => pom.version = Some(text_buf.clone()),
                        Some("packaging") => pom.packaging = Some(text_buf.clone()),
                        Some("name") => pom.name = Some(text_buf.clone()),
                        Some("description") => pom.description = Some(text_buf.clone()),
                        _ => {}
                    }
                }

                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(malformed(format!(
                    "failed to parse POM XML at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    if !seen_project {
        return Err(malformed("missing <project> root element".to_string()));
    }
    Ok(pom)
}

fn malformed(message: String) -> miette::Report {
    depot_util::errors::DepotError::Descriptor { message }.into()
}

/// Build a context string from the current XML path for matching.
fn path_context(path: &[String]) -> String {
    path.join(">")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
    <groupId>org.example</groupId>
    <artifactId>my-lib</artifactId>
    <version>1.0.0</version>
    <packaging>jar</packaging>
    <name>My Library</name>

    <properties>
        <slf4j.version>2.0.9</slf4j.version>
    </properties>

    <dependencies>
        <dependency>
            <groupId>org.slf4j</groupId>
            <artifactId>slf4j-api</artifactId>
            <version>${slf4j.version}</version>
        </dependency>
        <dependency>
            <groupId>junit</groupId>
            <artifactId>junit</artifactId>
            <version>4.13.2</version>
            <scope>test</scope>
            <optional>true</optional>
        </dependency>
    </dependencies>

    <build>
        <plugins>
            <plugin>
                <groupId>org.apache.maven.plugins</groupId>
                <artifactId>maven-jar-plugin</artifactId>
                <dependencies>
                    <dependency>
                        <groupId>ignored</groupId>
                        <artifactId>ignored</artifactId>
                    </dependency>
                </dependencies>
            </plugin>
        </plugins>
    </build>
</project>"#;

    #[test]
    fn parse_simple_pom() {
        let pom = parse_pom(SIMPLE_POM).unwrap();
        assert_eq!(pom.group_id.as_deref(), Some("org.example"));
        assert_eq!(pom.artifact_id.as_deref(), Some("my-lib"));
        assert_eq!(pom.version.as_deref(), Some("1.0.0"));
        assert_eq!(pom.packaging.as_deref(), Some("jar"));
        assert_eq!(pom.name.as_deref(), Some("My Library"));
        assert_eq!(pom.properties.get("slf4j.version").unwrap(), "2.0.9");
    }

    #[test]
    fn plugin_dependencies_are_not_project_dependencies() {
        let pom = parse_pom(SIMPLE_POM).unwrap();
        assert_eq!(pom.dependencies.len(), 2);
        assert_eq!(pom.dependencies[0].version.as_deref(), Some("${slf4j.version}"));
    }

    #[test]
    fn scope_and_optional() {
        let pom = parse_pom(SIMPLE_POM).unwrap();
        assert_eq!(pom.dependencies[0].scope, None);
        assert!(!pom.dependencies[0].optional);
        assert_eq!(pom.dependencies[1].scope.as_deref(), Some("test"));
        assert!(pom.dependencies[1].optional);
    }

    #[test]
    fn parent_ref_parsing() {
        let xml = r#"<?xml version="1.0"?>
<project>
    <parent>
        <groupId>org.example</groupId>
        <artifactId>parent-pom</artifactId>
        <version>2.0.0</version>
        <relativePath>../parent/pom.xml</relativePath>
    </parent>
    <artifactId>child</artifactId>
</project>"#;
        let pom = parse_pom(xml).unwrap();
        let p = pom.parent.as_ref().unwrap();
        assert_eq!(p.group_id, "org.example");
        assert_eq!(p.artifact_id, "parent-pom");
        assert_eq!(p.version, "2.0.0");
        assert_eq!(p.relative_path.as_deref(), Some("../parent/pom.xml"));
        assert_eq!(pom.group_id, None);
        assert_eq!(pom.artifact_id.as_deref(), Some("child"));
    }

    #[test]
    fn exclusion_parsing() {
        let xml = r#"<?xml version="1.0"?>
<project>
    <groupId>org.example</groupId>
    <artifactId>app</artifactId>
    <version>1.0</version>
    <dependencies>
        <dependency>
            <groupId>com.example</groupId>
            <artifactId>lib</artifactId>
            <version>1.0</version>
            <exclusions>
                <exclusion>
                    <groupId>commons-logging</groupId>
                    <artifactId>commons-logging</artifactId>
                </exclusion>
                <exclusion>
                    <groupId>org.unwanted</groupId>
                </exclusion>
            </exclusions>
        </dependency>
    </dependencies>
</project>"#;
        let pom = parse_pom(xml).unwrap();
        let dep = &pom.dependencies[0];
        assert_eq!(dep.group_id, "com.example");
        assert_eq!(dep.artifact_id, "lib");
        assert_eq!(dep.exclusions.len(), 2);
        assert_eq!(dep.exclusions[0].name(), "commons-logging+commons-logging");
        assert_eq!(dep.exclusions[1].name(), "org.unwanted+*");
    }

    #[test]
    fn escaped_text_is_unescaped() {
        let xml = r#"<project><artifactId>a</artifactId><description>R&amp;D tools</description></project>"#;
        let pom = parse_pom(xml).unwrap();
        assert_eq!(pom.description.as_deref(), Some("R&D tools"));
    }

    #[test]
    fn non_project_root_is_malformed() {
        let err = parse_pom("<html><body>404</body></html>").unwrap_err();
        assert!(err.to_string().contains("Malformed descriptor"));
    }

    #[test]
    fn broken_xml_is_malformed() {
        assert!(parse_pom("<project><artifactId>a</groupId></project>").is_err());
        assert!(parse_pom("").is_err());
    }
}
