//! Effective descriptors: a parsed POM merged with its resolved parent chain.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use depot_core::coordinate::Coordinate;
use depot_core::properties::{Environment, MapEnvironment, ProcessEnvironment};
use depot_core::report::{Reporter, TracingReporter};
use depot_core::scope::Scope;
use depot_util::errors::DepotError;

use crate::macros::{MacroSource, Substitutor};
use crate::pom::{ParentRef, Pom, PomDependency};

/// A declared dependency, scope already validated.
///
/// Group, artifact and version are kept as written; `${...}` tokens are
/// expanded by whoever walks the dependency, against the declaring descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Scope,
    pub optional: bool,
    /// `group+artifact` names this dependency keeps out of its subtree.
    pub exclusions: BTreeSet<String>,
}

impl Dependency {
    fn from_pom(dep: &PomDependency) -> miette::Result<Self> {
        let scope = match dep.scope.as_deref().map(str::trim) {
            None | Some("") => Scope::Compile,
            Some(raw) => raw.parse::<Scope>().map_err(|e| DepotError::DescriptorField {
                message: format!(
                    "dependency {}:{} has an invalid scope",
                    dep.group_id.trim(),
                    dep.artifact_id.trim()
                ),
                source: Box::new(e),
            })?,
        };
        Ok(Self {
            group_id: dep.group_id.trim().to_string(),
            artifact_id: dep.artifact_id.trim().to_string(),
            version: dep
                .version
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            scope,
            optional: dep.optional,
            exclusions: dep.exclusions.iter().map(|e| e.name()).collect(),
        })
    }

    /// `group+artifact` as declared, before substitution.
    pub fn name(&self) -> String {
        format!("{}+{}", self.group_id, self.artifact_id)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.group_id,
            self.artifact_id,
            self.version
                .as_deref()
                .unwrap_or(depot_core::coordinate::VERSION_NOT_SET)
        )
    }
}

/// An immutable, fully inherited POM.
#[derive(Debug, Clone, Serialize)]
pub struct Descriptor {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub packaging: String,
    pub dependencies: Vec<Dependency>,
    pub properties: BTreeMap<String, String>,
    /// Parent chain, closest first.
    #[serde(serialize_with = "serialize_ancestors")]
    pub ancestors: Vec<Arc<Descriptor>>,
    /// Directory of the file this descriptor was parsed from.
    pub base_dir: Option<PathBuf>,
    /// Repository URL the descriptor was verified against, if it came from one.
    pub source: Option<String>,
}

fn serialize_ancestors<S: Serializer>(
    ancestors: &[Arc<Descriptor>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(ancestors.iter().map(|a| a.coordinate().to_string()))
}

impl Descriptor {
    /// Merge `pom` over its already-resolved `parent`.
    ///
    /// The child's non-empty header values win, empty ones are taken from the
    /// parent (or from the `<parent>` reference when no parent descriptor is
    /// available). Properties and dependencies are merged with the child
    /// overriding on key and `group+artifact` collisions.
    pub fn inherit(
        pom: Pom,
        parent: Option<Arc<Descriptor>>,
        base_dir: Option<PathBuf>,
        source: Option<String>,
    ) -> miette::Result<Self> {
        let mut dependencies: Vec<Dependency> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for dep in &pom.dependencies {
            let dep = Dependency::from_pom(dep)?;
            if seen.insert(dep.name()) {
                dependencies.push(dep);
            }
        }

        let mut properties = BTreeMap::new();
        let mut ancestors = Vec::new();
        if let Some(ref parent) = parent {
            properties.extend(parent.properties.clone());
            for dep in &parent.dependencies {
                if seen.insert(dep.name()) {
                    dependencies.push(dep.clone());
                }
            }
            ancestors.push(Arc::clone(parent));
            ancestors.extend(parent.ancestors.iter().cloned());
        }
        properties.extend(pom.properties.clone());

        let parent_ref = pom.parent.as_ref();
        let group_id = first_non_empty([
            pom.group_id.as_deref(),
            parent.as_deref().map(|p| p.group_id.as_str()),
            parent_ref.map(|r: &ParentRef| r.group_id.as_str()),
        ]);
        let artifact_id = first_non_empty([
            pom.artifact_id.as_deref(),
            parent.as_deref().map(|p| p.artifact_id.as_str()),
            None,
        ]);
        let version = first_non_empty([
            pom.version.as_deref(),
            parent.as_deref().map(|p| p.version.as_str()),
            parent_ref.map(|r| r.version.as_str()),
        ]);
        let description = first_non_empty([
            pom.description.as_deref(),
            parent.as_deref().map(|p| p.description.as_str()),
            None,
        ]);

        let mut descriptor = Self {
            group_id,
            artifact_id,
            version,
            name: pom.name.as_deref().unwrap_or_default().trim().to_string(),
            description,
            packaging: first_non_empty([pom.packaging.as_deref(), Some("jar"), None]),
            dependencies,
            properties,
            ancestors,
            base_dir,
            source,
        };
        descriptor.expand_header();
        Ok(descriptor)
    }

    /// Expand `${...}` in the header fields once, e.g. `<version>${revision}</version>`.
    fn expand_header(&mut self) {
        let needs = [&self.group_id, &self.artifact_id, &self.version]
            .iter()
            .any(|v| v.contains("${"));
        if !needs {
            return;
        }
        let snapshot = self.clone();
        let env = MapEnvironment::isolated(BTreeMap::new());
        let reporter = TracingReporter;
        let subst = Substitutor::new(&env, &reporter).source(&snapshot);
        self.group_id = subst.substitute(Some(&snapshot.group_id));
        self.artifact_id = subst.substitute(Some(&snapshot.artifact_id));
        self.version = subst.substitute(Some(&snapshot.version));
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.group_id, &self.artifact_id, &self.version)
    }

    /// The closest parent, if any.
    pub fn parent(&self) -> Option<&Arc<Descriptor>> {
        self.ancestors.first()
    }

    /// A substitutor that looks in this descriptor, then `env`.
    pub fn substitutor<'a>(
        &'a self,
        env: &'a dyn Environment,
        reporter: &'a dyn Reporter,
    ) -> Substitutor<'a> {
        Substitutor::new(env, reporter).source(self)
    }

    pub fn substitute(
        &self,
        raw: Option<&str>,
        env: &dyn Environment,
        reporter: &dyn Reporter,
    ) -> String {
        self.substitutor(env, reporter).substitute(raw)
    }

    /// A merged property with its macros expanded against this descriptor
    /// and the process environment.
    pub fn property(&self, key: &str) -> Option<String> {
        self.property_with(key, &ProcessEnvironment, &TracingReporter)
    }

    pub fn property_with(
        &self,
        key: &str,
        env: &dyn Environment,
        reporter: &dyn Reporter,
    ) -> Option<String> {
        let raw = self.properties.get(key)?;
        Some(self.substitute(Some(raw), env, reporter))
    }

    fn builtin(&self, key: &str) -> Option<String> {
        let value = match key {
            "version" | "pom.version" | "project.version" => self.version.clone(),
            "groupId" | "pom.groupId" | "project.groupId" => self.group_id.clone(),
            "artifactId" | "pom.artifactId" | "project.artifactId" => self.artifact_id.clone(),
            "pom.name" | "project.name" => self.name.clone(),
            "pom.description" | "project.description" => self.description.clone(),
            "pom.packaging" | "project.packaging" => self.packaging.clone(),
            "project.parent.groupId" => self.parent()?.group_id.clone(),
            "project.parent.artifactId" => self.parent()?.artifact_id.clone(),
            "project.parent.version" => self.parent()?.version.clone(),
            "basedir" | "project.basedir" => {
                let dir = self.base_dir.as_ref()?;
                std::path::absolute(dir)
                    .unwrap_or_else(|_| dir.clone())
                    .display()
                    .to_string()
            }
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    }
}

impl MacroSource for Descriptor {
    fn resolve_macro(&self, key: &str) -> Option<String> {
        self.builtin(key).or_else(|| self.properties.get(key).cloned())
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coordinate())
    }
}

fn first_non_empty(candidates: [Option<&str>; 3]) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}
