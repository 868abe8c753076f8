//! Dependency resolution
//!
//! Expands a root manifest's declared dependencies into a flat,
//! deduplicated, topologically ordered installation plan. The root package
//! itself is never part of the plan; the orchestrator installs it last,
//! after every plan entry has succeeded.
//!
//! Resolution is two explicit work-list passes (dependency depth is
//! author-controlled input, so no unbounded recursion):
//!
//! 1. **Pinning**: walk references breadth-first, fetching each
//!    package's version metadata at most once per key. The first
//!    requirement for a key wins unless a later requirement names a
//!    strictly higher version, which supersedes the pin and re-expands
//!    that version's own dependencies (maximum-version-wins).
//! 2. **Ordering**: depth-first walk of the pinned graph emitting
//!    post-order, so every dependency precedes its dependents. An edge
//!    back into the active stack is a circular declaration: logged and
//!    treated as already satisfied, never an error.

use crate::ident::PackageReference;
use crate::manifest::PackageManifest;
use crate::registry::{Registry, RegistryError};
use crate::semver::Version;
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during resolution
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Metadata for a referenced package could not be fetched
    #[error("Failed to resolve {package}: {source}")]
    MetadataFetch {
        package: String,
        #[source]
        source: RegistryError,
    },
}

/// One node in the flattened installation plan
#[derive(Debug, Clone)]
pub struct PlanEntry {
    /// Resolved manifest (namespace always backfilled)
    pub manifest: PackageManifest,

    /// Version selected for installation
    pub version: Version,
}

impl PlanEntry {
    /// Identity key (`namespace-name`). Resolution backfills the
    /// namespace before an entry is created; a bare name only occurs for
    /// hand-assembled manifests.
    pub fn key(&self) -> String {
        match &self.manifest.namespace {
            Some(ns) => format!("{}-{}", ns, self.manifest.name),
            None => self.manifest.name.clone(),
        }
    }
}

struct Pinned {
    version: Version,
    manifest: PackageManifest,
}

/// Dependency resolver
pub struct DependencyResolver<'a> {
    registry: &'a dyn Registry,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(registry: &'a dyn Registry) -> Self {
        Self { registry }
    }

    /// Resolve the installation plan for a root manifest.
    ///
    /// `already_installed` keys are skipped entirely: their metadata is
    /// never fetched and they never enter the plan.
    pub fn resolve(
        &self,
        root: &PackageManifest,
        already_installed: &HashSet<String>,
    ) -> Result<Vec<PlanEntry>, ResolverError> {
        let root_key = root.key();
        let skip = |key: &str| {
            already_installed.contains(key) || root_key.as_deref() == Some(key)
        };

        let pinned = self.pin_versions(root, &skip)?;
        Ok(order_plan(root, pinned, &skip))
    }

    /// Phase 1: pick one version per key, maximum-version-wins
    fn pin_versions(
        &self,
        root: &PackageManifest,
        skip: &dyn Fn(&str) -> bool,
    ) -> Result<HashMap<String, Pinned>, ResolverError> {
        let mut pinned: HashMap<String, Pinned> = HashMap::new();
        let mut queue: VecDeque<PackageReference> = root.dependencies.iter().cloned().collect();

        while let Some(reference) = queue.pop_front() {
            let key = reference.key();
            if skip(&key) {
                continue;
            }

            if let Some(existing) = pinned.get(&key) {
                match reference.version {
                    Some(requested) if requested > existing.version => {
                        warn!(
                            package = %key,
                            kept = %requested,
                            superseded = %existing.version,
                            "conflicting version requirements; taking the higher version"
                        );
                        let (version, manifest) = self.fetch_manifest(&reference)?;
                        queue.extend(manifest.dependencies.iter().cloned());
                        pinned.insert(key, Pinned { version, manifest });
                    }
                    // Equal or lower requirement: the existing pin stands.
                    _ => {}
                }
                continue;
            }

            let (version, manifest) = self.fetch_manifest(&reference)?;
            queue.extend(manifest.dependencies.iter().cloned());
            pinned.insert(key, Pinned { version, manifest });
        }

        Ok(pinned)
    }

    /// Fetch the metadata for a reference: the pinned version when one
    /// was named, the latest published version otherwise.
    fn fetch_manifest(
        &self,
        reference: &PackageReference,
    ) -> Result<(Version, PackageManifest), ResolverError> {
        let document = match &reference.version {
            Some(version) => {
                self.registry
                    .get_version(&reference.namespace, &reference.name, version)
            }
            None => self
                .registry
                .get_package(&reference.namespace, &reference.name)
                .map(|metadata| metadata.latest_version),
        }
        .map_err(|source| ResolverError::MetadataFetch {
            package: reference.full_name(),
            source,
        })?;

        let version = document.version_number;
        let manifest = document.into_manifest(&reference.namespace);
        Ok((version, manifest))
    }
}

/// Phase 2: emit the pinned packages in dependency order.
///
/// Iterative DFS driven from the root's declared dependencies so the
/// output is deterministic for a given root. Pins left unreachable after
/// a version was superseded are dropped.
fn order_plan(
    root: &PackageManifest,
    mut pinned: HashMap<String, Pinned>,
    skip: &dyn Fn(&str) -> bool,
) -> Vec<PlanEntry> {
    enum Frame {
        Enter(String),
        Exit(String),
    }

    let mut order: Vec<String> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut on_stack: HashSet<String> = HashSet::new();

    let mut stack: Vec<Frame> = root
        .dependencies
        .iter()
        .rev()
        .map(|r| Frame::Enter(r.key()))
        .collect();

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(key) => {
                if visited.contains(&key) || on_stack.contains(&key) || !pinned.contains_key(&key)
                {
                    continue;
                }

                on_stack.insert(key.clone());
                stack.push(Frame::Exit(key.clone()));

                for dependency in pinned[&key].manifest.dependencies.iter().rev() {
                    let dep_key = dependency.key();
                    if skip(&dep_key) || visited.contains(&dep_key) {
                        continue;
                    }
                    if on_stack.contains(&dep_key) {
                        warn!(
                            package = %key,
                            dependency = %dep_key,
                            "circular dependency declaration; treating as satisfied"
                        );
                        continue;
                    }
                    stack.push(Frame::Enter(dep_key));
                }
            }
            Frame::Exit(key) => {
                on_stack.remove(&key);
                visited.insert(key.clone());
                order.push(key);
            }
        }
    }

    if order.len() < pinned.len() {
        debug!(
            dropped = pinned.len() - order.len(),
            "pins left unreachable after version supersession"
        );
    }

    order
        .into_iter()
        .filter_map(|key| pinned.remove(&key))
        .map(|pin| PlanEntry {
            manifest: pin.manifest,
            version: pin.version,
        })
        .collect()
}
