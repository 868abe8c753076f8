//! Install orchestration
//!
//! Drives a resolved plan to completion: a bounded concurrent fetch phase
//! through the download cache, then a strictly sequential install phase in
//! plan order, with the root package installed last. The first failure in
//! either phase aborts the batch; installs recorded before the failure are
//! kept, and nothing is rolled back.

use crate::cache::{CacheError, DownloadCache};
use crate::installer::{Installer, InstallerError};
use crate::manifest::PackageManifest;
use crate::profile::{GameDefinition, ModProfile};
use crate::resolver::PlanEntry;
use crate::semver::Version;
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

/// Fetch workers used when the caller does not override the bound
pub const DEFAULT_FETCH_WORKERS: usize = 4;

/// Errors that can occur during orchestration
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// An archive download failed; nothing was installed in this run
    /// beyond what `installed()` reports (always zero for this variant)
    #[error(transparent)]
    Fetch(#[from] CacheError),

    /// A plan entry has no download URL to fetch from
    #[error("No download URL for {0}")]
    MissingDownloadUrl(String),

    /// An install failed after `installed` packages had already been
    /// recorded; those stay recorded
    #[error("Install of {key} failed: {source}")]
    Install {
        key: String,
        installed: usize,
        #[source]
        source: InstallerError,
    },
}

impl OrchestratorError {
    /// Number of installs recorded before the failure
    pub fn installed(&self) -> usize {
        match self {
            OrchestratorError::Install { installed, .. } => *installed,
            _ => 0,
        }
    }
}

/// Receives progress notifications from an install run.
///
/// Fetch completions arrive from concurrent workers; implementations only
/// see an already-aggregated running count.
pub trait InstallObserver: Sync {
    /// An archive finished downloading (`completed` out of `total`)
    fn fetch_progress(&self, _completed: usize, _total: usize) {}

    /// A package was installed and recorded
    fn installed(&self, _key: &str, _version: &Version) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl InstallObserver for NoopObserver {}

/// Where the root package's archive comes from
#[derive(Debug, Clone)]
pub enum RootArchive {
    /// Local archive already on disk
    Local(PathBuf),

    /// Fetched through the cache like any dependency
    Remote { url: String },
}

/// The package the user asked for, installed after its whole plan
#[derive(Debug, Clone)]
pub struct RootInstall {
    /// Root manifest (namespace backfilled by the caller)
    pub manifest: PackageManifest,

    /// Root archive source
    pub archive: RootArchive,
}

/// Outcome of a successful run
#[derive(Debug)]
pub struct InstallReport {
    /// Packages installed this run (root included)
    pub installed: usize,

    /// Plan entries skipped because the profile already had them
    pub skipped: usize,
}

struct FetchJob {
    key: String,
    cache_key: String,
    url: String,
}

/// Install orchestrator
pub struct InstallOrchestrator<'a> {
    cache: &'a DownloadCache,
    installer: &'a dyn Installer,
    observer: &'a dyn InstallObserver,
    fetch_workers: usize,
}

impl<'a> InstallOrchestrator<'a> {
    pub fn new(
        cache: &'a DownloadCache,
        installer: &'a dyn Installer,
        observer: &'a dyn InstallObserver,
    ) -> Self {
        Self {
            cache,
            installer,
            observer,
            fetch_workers: DEFAULT_FETCH_WORKERS,
        }
    }

    /// Override the fetch-phase concurrency bound
    pub fn with_fetch_workers(mut self, workers: usize) -> Self {
        self.fetch_workers = workers.max(1);
        self
    }

    /// Install every plan entry, then the root package.
    ///
    /// The profile is mutated in memory as installs succeed; persisting it
    /// is the caller's responsibility.
    pub fn install_all(
        &self,
        plan: Vec<PlanEntry>,
        root: RootInstall,
        profile: &mut ModProfile,
        game: &GameDefinition,
    ) -> Result<InstallReport, OrchestratorError> {
        let root_key = match &root.manifest.namespace {
            Some(ns) => format!("{}-{}", ns, root.manifest.name),
            None => root.manifest.name.clone(),
        };
        let root_installed =
            profile.installed_version(&root_key) == Some(root.manifest.version_number);

        // Entries the profile already records are not reinstalled.
        let total = plan.len();
        let pending: Vec<PlanEntry> = plan
            .into_iter()
            .filter(|entry| !profile.is_installed(&entry.key()))
            .collect();
        let skipped = total - pending.len();

        // Fetch phase: everything needed, before any install starts.
        let mut jobs: Vec<FetchJob> = Vec::with_capacity(pending.len() + 1);
        for entry in &pending {
            let key = entry.key();
            let url = entry
                .manifest
                .download_url
                .clone()
                .ok_or_else(|| OrchestratorError::MissingDownloadUrl(key.clone()))?;
            jobs.push(FetchJob {
                cache_key: format!("{}-{}.zip", key, entry.version),
                key,
                url,
            });
        }

        let mut root_job = false;
        if !root_installed {
            if let RootArchive::Remote { url } = &root.archive {
                jobs.push(FetchJob {
                    cache_key: format!("{}-{}.zip", root_key, root.manifest.version_number),
                    key: root_key.clone(),
                    url: url.clone(),
                });
                root_job = true;
            }
        }

        let mut paths = self.fetch_all(&jobs)?;
        let root_path = if root_job { paths.pop() } else { None };

        // Install phase: strictly sequential, in plan order.
        let mut installed = 0;
        for (entry, archive) in pending.iter().zip(&paths) {
            let key = entry.key();
            self.check_size(&key, entry.manifest.file_size, archive);

            self.installer
                .install(
                    &game.install_dir,
                    &profile.directory,
                    archive,
                    entry.manifest.namespace.as_deref(),
                )
                .map_err(|source| OrchestratorError::Install {
                    key: key.clone(),
                    installed,
                    source,
                })?;

            profile.record_install(key.clone(), entry.manifest.clone());
            installed += 1;
            self.observer.installed(&key, &entry.version);
        }

        // Root last. An identical version already recorded is a no-op.
        if !root_installed {
            let archive = match (&root.archive, root_path) {
                (RootArchive::Local(path), _) => path.clone(),
                (RootArchive::Remote { .. }, Some(path)) => path,
                (RootArchive::Remote { url }, None) => {
                    // Unreachable: the remote root is always part of the
                    // fetch phase. Fail loudly rather than install nothing.
                    return Err(OrchestratorError::Fetch(CacheError::Fetch {
                        key: root_key,
                        reason: format!("archive for {} was never fetched", url),
                    }));
                }
            };

            self.check_size(&root_key, root.manifest.file_size, &archive);
            self.installer
                .install(
                    &game.install_dir,
                    &profile.directory,
                    &archive,
                    root.manifest.namespace.as_deref(),
                )
                .map_err(|source| OrchestratorError::Install {
                    key: root_key.clone(),
                    installed,
                    source,
                })?;

            profile.record_install(root_key.clone(), root.manifest.clone());
            installed += 1;
            self.observer
                .installed(&root_key, &root.manifest.version_number);
        }

        Ok(InstallReport { installed, skipped })
    }

    /// Fetch every job through the cache with a bounded worker pool.
    ///
    /// Workers pull jobs from a shared cursor; the first failure stops new
    /// work from being claimed while in-flight downloads run to completion
    /// (partial siblings are non-destructive and reusable later). Results
    /// come back in job order.
    fn fetch_all(&self, jobs: &[FetchJob]) -> Result<Vec<PathBuf>, OrchestratorError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let cache = self.cache;
        let observer = self.observer;
        let total = jobs.len();
        let next = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let slots: Mutex<Vec<Option<PathBuf>>> = Mutex::new(vec![None; total]);
        let first_error: Mutex<Option<CacheError>> = Mutex::new(None);

        let workers = self.fetch_workers.min(total);
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    if index >= total {
                        break;
                    }
                    let job = &jobs[index];

                    match cache.get_or_fetch(&job.cache_key, &job.url) {
                        Ok(path) => {
                            slots.lock()[index] = Some(path);
                            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                            observer.fetch_progress(done, total);
                        }
                        Err(err) => {
                            warn!(key = %job.key, "fetch failed: {err}");
                            abort.store(true, Ordering::Relaxed);
                            let mut slot = first_error.lock();
                            if slot.is_none() {
                                *slot = Some(err);
                            }
                        }
                    }
                });
            }
        });

        if let Some(err) = first_error.into_inner() {
            return Err(err.into());
        }

        let mut paths = Vec::with_capacity(total);
        for (index, slot) in slots.into_inner().into_iter().enumerate() {
            match slot {
                Some(path) => paths.push(path),
                None => {
                    return Err(OrchestratorError::Fetch(CacheError::Fetch {
                        key: jobs[index].cache_key.clone(),
                        reason: "download did not complete".to_string(),
                    }));
                }
            }
        }
        Ok(paths)
    }

    /// Cross-check a fetched archive against the manifest's declared size.
    /// A mismatch is a diagnostic, not an error; the repository's size
    /// fields are advisory.
    fn check_size(&self, key: &str, expected: u64, archive: &std::path::Path) {
        if expected == 0 {
            return;
        }
        if let Ok(metadata) = fs::metadata(archive) {
            if metadata.len() != expected {
                warn!(
                    key,
                    expected,
                    actual = metadata.len(),
                    "archive size differs from manifest"
                );
            } else {
                debug!(key, size = expected, "archive size verified");
            }
        }
    }
}
