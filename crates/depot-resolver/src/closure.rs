//! Transitive dependency closure: level-by-level BFS over descriptors, with
//! exclusions honored only when the whole introducing chain agrees.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use depot_core::coordinate::Coordinate;
use depot_core::properties::{Environment, ProcessEnvironment};
use depot_core::report::{Diagnostic, Diagnostics, Reporter};
use depot_core::scope::Scope;
use depot_maven::descriptor::{Dependency, Descriptor};
use depot_maven::registry::Registry;
use depot_maven::repository::RemoteRepository;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const MAX_CONCURRENT_FETCHES: usize = 8;

/// Output of a closure run. Failures along individual edges end up in
/// `diagnostics`; they never abort the run.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Resolved descriptors in discovery order, one per `(group, artifact)`.
    pub dependencies: Vec<Arc<Descriptor>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// One edge waiting in the BFS queue.
struct Frame {
    dependency: Dependency,
    /// Descriptor whose dependency list holds `dependency`.
    declared_by: Arc<Descriptor>,
    /// Frame that introduced `declared_by`; `None` for direct dependencies of the root.
    ancestor: Option<usize>,
    depth: usize,
}

/// A frame that survived filtering and needs its descriptor.
struct Candidate {
    frame: usize,
    coordinate: Coordinate,
    key: (String, String),
}

pub struct ClosureEngine {
    registry: Registry,
    repos: Arc<[RemoteRepository]>,
    env: Arc<dyn Environment>,
}

impl ClosureEngine {
    pub fn new(registry: Registry, repos: Vec<RemoteRepository>) -> Self {
        Self {
            registry,
            repos: repos.into(),
            env: Arc::new(ProcessEnvironment),
        }
    }

    /// Replace the environment consulted for macros no descriptor defines.
    pub fn with_environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    pub fn repositories(&self) -> &[RemoteRepository] {
        &self.repos
    }

    /// Compute the dependencies of `root` with exactly `scope`, transitively.
    pub async fn resolve(&self, root: &Arc<Descriptor>, scope: Scope) -> Resolution {
        let diagnostics = Diagnostics::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut present: HashSet<(String, String)> = HashSet::new();
        let mut results: Vec<Arc<Descriptor>> = Vec::new();

        present.insert((root.group_id.clone(), root.artifact_id.clone()));
        for dependency in &root.dependencies {
            frames.push(Frame {
                dependency: dependency.clone(),
                declared_by: Arc::clone(root),
                ancestor: None,
                depth: 1,
            });
            queue.push_back(frames.len() - 1);
        }

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));

        while !queue.is_empty() {
            let current_depth = queue.front().map(|&i| frames[i].depth).unwrap_or(0);
            let mut level: Vec<usize> = Vec::new();
            while let Some(&i) = queue.front() {
                if frames[i].depth != current_depth {
                    break;
                }
                queue.pop_front();
                level.push(i);
            }

            let candidates = self.filter_level(&frames, &level, root, scope, &present, &diagnostics);
            let mut fetched = self.fetch_level(&candidates, &semaphore).await;

            for candidate in candidates {
                if present.contains(&candidate.key) {
                    continue;
                }
                let introducer = introducer(&frames, candidate.frame);
                let outcome = match fetched.remove(&candidate.frame) {
                    Some(outcome) => outcome,
                    // A same-key frame earlier in this level failed.
                    None => self.registry.descriptor(&candidate.coordinate, &self.repos).await,
                };
                match outcome {
                    Ok(Some(descriptor)) => {
                        tracing::debug!("resolved {} from {introducer}", candidate.coordinate);
                        present.insert(candidate.key);
                        results.push(Arc::clone(&descriptor));
                        for dependency in &descriptor.dependencies {
                            frames.push(Frame {
                                dependency: dependency.clone(),
                                declared_by: Arc::clone(&descriptor),
                                ancestor: Some(candidate.frame),
                                depth: current_depth + 1,
                            });
                            queue.push_back(frames.len() - 1);
                        }
                    }
                    Ok(None) => diagnostics.error(&format!(
                        "Cannot find {} from {introducer}",
                        candidate.coordinate
                    )),
                    Err(e) => diagnostics.error(&format!(
                        "Cannot resolve {} from {introducer}: {e}",
                        candidate.coordinate
                    )),
                }
            }
        }

        Resolution {
            dependencies: results,
            diagnostics: diagnostics.into_vec(),
        }
    }

    /// Substitute, then drop optional, excluded, out-of-scope and already
    /// resolved frames. Same-key frames stay in queue order so a later one
    /// can stand in for an earlier one that fails.
    fn filter_level(
        &self,
        frames: &[Frame],
        level: &[usize],
        root: &Descriptor,
        scope: Scope,
        present: &HashSet<(String, String)>,
        reporter: &dyn Reporter,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for &i in level {
            let frame = &frames[i];
            let dep = &frame.dependency;
            if dep.optional || dep.scope != scope {
                continue;
            }

            let subst = frame
                .declared_by
                .substitutor(self.env.as_ref(), reporter)
                .source(root);
            let group = subst.substitute(Some(&dep.group_id));
            let artifact = subst.substitute(Some(&dep.artifact_id));
            let version = dep
                .version
                .as_deref()
                .map(|v| subst.substitute(Some(v)))
                .unwrap_or_default();

            let name = format!("{group}+{artifact}");
            if let Some(ancestor) = frame.ancestor {
                if excluded(frames, ancestor, &name, &group) {
                    tracing::debug!("{name} excluded below {}", frames[ancestor].dependency);
                    continue;
                }
            }

            let key = (group, artifact);
            if present.contains(&key) {
                continue;
            }
            candidates.push(Candidate {
                frame: i,
                coordinate: Coordinate::new(&key.0, &key.1, &version),
                key,
            });
        }
        candidates
    }

    /// Resolve the first candidate of each `(group, artifact)` in the level
    /// concurrently, keyed by frame.
    async fn fetch_level(
        &self,
        candidates: &[Candidate],
        semaphore: &Arc<Semaphore>,
    ) -> HashMap<usize, miette::Result<Option<Arc<Descriptor>>>> {
        let mut claimed: HashSet<&(String, String)> = HashSet::new();
        let mut join_set = JoinSet::new();
        for candidate in candidates {
            if !claimed.insert(&candidate.key) {
                continue;
            }
            let registry = self.registry.clone();
            let repos = Arc::clone(&self.repos);
            let sem = Arc::clone(semaphore);
            let coordinate = candidate.coordinate.clone();
            let frame = candidate.frame;
            join_set.spawn(async move {
                let _permit = sem.acquire().await;
                (frame, registry.descriptor(&coordinate, &repos).await)
            });
        }

        let mut fetched = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((frame, result)) => {
                    fetched.insert(frame, result);
                }
                Err(e) => tracing::warn!("Descriptor task failed: {e}"),
            }
        }
        fetched
    }
}

/// Whether `name` is excluded by frame `at` and every frame above it.
fn excluded(frames: &[Frame], at: usize, name: &str, group: &str) -> bool {
    let wildcard = format!("{group}+*");
    let mut current = Some(at);
    while let Some(i) = current {
        let exclusions = &frames[i].dependency.exclusions;
        if !(exclusions.contains(name)
            || exclusions.contains(&wildcard)
            || exclusions.contains("*+*"))
        {
            return false;
        }
        current = frames[i].ancestor;
    }
    true
}

fn introducer(frames: &[Frame], at: usize) -> String {
    match frames[at].ancestor {
        None => "top".to_string(),
        Some(_) => frames[at].declared_by.coordinate().to_string(),
    }
}
