//! Download cache
//!
//! Local store for fetched mod archives, keyed by a stable filename
//! derived from package identity and version. A key that is present on
//! disk is never re-fetched; concurrent requests for the same missing key
//! coalesce into a single network fetch, with every caller receiving the
//! same outcome. Writes go through a `tmp/` staging file and a rename so a
//! cache entry is either absent or complete.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive fetch failed, tagged with the cache key it was for
    #[error("Failed to fetch {key}: {reason}")]
    Fetch { key: String, reason: String },
}

/// Downloads archive bytes to a destination file.
///
/// The production implementation is [`HttpArchiveFetcher`]; tests
/// substitute fakes to exercise the cache without a network.
pub trait ArchiveFetcher: Send + Sync {
    /// Download `url` into `dest`. The destination's parent directory
    /// exists; a partially written file may be left behind on failure.
    fn fetch(&self, url: &str, dest: &Path) -> io::Result<()>;
}

/// One in-flight fetch. The leader publishes into `result` and wakes the
/// waiters; a failure is carried as the rendered reason so every waiter
/// can surface it tagged with the key.
struct InFlight {
    result: Mutex<Option<Result<PathBuf, String>>>,
    done: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }
}

enum Role {
    Leader(Arc<InFlight>),
    Waiter(Arc<InFlight>),
}

/// Cache for downloaded mod archives
///
/// Directory structure:
/// ```text
/// <cache root>/
/// ├── author-ModA-1.0.0.zip
/// ├── other-Lib-2.0.0.zip
/// └── tmp/
/// ```
pub struct DownloadCache {
    /// Root cache directory
    root: PathBuf,

    /// Transport used for cache misses
    fetcher: Arc<dyn ArchiveFetcher>,

    /// In-flight fetches, for same-key coalescing
    in_flight: Mutex<HashMap<String, Arc<InFlight>>>,
}

impl DownloadCache {
    /// Open the cache, creating the directory structure if needed
    pub fn new(root: PathBuf, fetcher: Arc<dyn ArchiveFetcher>) -> Result<Self, CacheError> {
        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join("tmp"))?;

        Ok(Self {
            root,
            fetcher,
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    /// Path an entry for `key` would live at
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Check whether an entry for `key` is already present
    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// Return the cached path for `key`, fetching `url` on a miss.
    ///
    /// Exactly one fetch runs per key per process run: concurrent callers
    /// for the same missing key block until the first caller's fetch
    /// settles, then observe the same path or the same failure.
    pub fn get_or_fetch(&self, key: &str, url: &str) -> Result<PathBuf, CacheError> {
        let path = self.path_for(key);
        if path.is_file() {
            return Ok(path);
        }

        let role = {
            let mut in_flight = self.in_flight.lock();
            // A fetch may have completed between the unlocked check and
            // acquiring the map lock.
            if path.is_file() {
                return Ok(path);
            }
            match in_flight.get(key) {
                Some(flight) => Role::Waiter(Arc::clone(flight)),
                None => {
                    let flight = Arc::new(InFlight::new());
                    in_flight.insert(key.to_string(), Arc::clone(&flight));
                    Role::Leader(flight)
                }
            }
        };

        match role {
            Role::Waiter(flight) => {
                debug!(key, "coalescing into in-flight fetch");
                let mut result = flight.result.lock();
                loop {
                    match &*result {
                        Some(Ok(path)) => return Ok(path.clone()),
                        Some(Err(reason)) => {
                            return Err(CacheError::Fetch {
                                key: key.to_string(),
                                reason: reason.clone(),
                            });
                        }
                        None => flight.done.wait(&mut result),
                    }
                }
            }
            Role::Leader(flight) => {
                let outcome = self.fetch_into(key, url, &path);

                let mut result = flight.result.lock();
                *result = Some(match &outcome {
                    Ok(path) => Ok(path.clone()),
                    Err(err) => Err(err.to_string()),
                });
                flight.done.notify_all();
                drop(result);

                self.in_flight.lock().remove(key);
                outcome
            }
        }
    }

    /// Fetch `url` into the staging area, then move it into place
    fn fetch_into(&self, key: &str, url: &str, path: &Path) -> Result<PathBuf, CacheError> {
        debug!(key, url, "fetching archive");
        let tmp_path = self.root.join("tmp").join(format!("{}.part", key));

        self.fetcher
            .fetch(url, &tmp_path)
            .map_err(|err| CacheError::Fetch {
                key: key.to_string(),
                reason: err.to_string(),
            })?;

        fs::rename(&tmp_path, path)?;
        Ok(path.to_path_buf())
    }
}

/// HTTP transport for cache misses
pub struct HttpArchiveFetcher {
    client: reqwest::blocking::Client,
}

impl HttpArchiveFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("modpm/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

impl ArchiveFetcher for HttpArchiveFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> io::Result<()> {
        let mut response = self.client.get(url).send().map_err(io::Error::other)?;

        if !response.status().is_success() {
            return Err(io::Error::other(format!(
                "HTTP {} for {}",
                response.status(),
                url
            )));
        }

        let mut file = fs::File::create(dest)?;
        response.copy_to(&mut file).map_err(io::Error::other)?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingFetcher {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    impl ArchiveFetcher for CountingFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> io::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            fs::write(dest, b"archive bytes")
        }
    }

    struct FailingFetcher;

    impl ArchiveFetcher for FailingFetcher {
        fn fetch(&self, _url: &str, _dest: &Path) -> io::Result<()> {
            Err(io::Error::other("connection reset"))
        }
    }

    #[test]
    fn test_hit_skips_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
        let cache = DownloadCache::new(
            dir.path().join("cache"),
            Arc::clone(&fetcher) as Arc<dyn ArchiveFetcher>,
        )
        .unwrap();

        fs::write(cache.path_for("a-B-1.0.0.zip"), b"already here").unwrap();

        let path = cache
            .get_or_fetch("a-B-1.0.0.zip", "https://repo.test/a/B/1.0.0.zip")
            .unwrap();
        assert_eq!(path, cache.path_for("a-B-1.0.0.zip"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_miss_fetches_once_then_hits() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
        let cache = DownloadCache::new(
            dir.path().join("cache"),
            Arc::clone(&fetcher) as Arc<dyn ArchiveFetcher>,
        )
        .unwrap();

        let first = cache.get_or_fetch("a-B-1.0.0.zip", "https://repo.test/a").unwrap();
        let second = cache.get_or_fetch("a-B-1.0.0.zip", "https://repo.test/a").unwrap();

        assert_eq!(first, second);
        assert!(first.is_file());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_same_key_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(100)));
        let cache = DownloadCache::new(
            dir.path().join("cache"),
            Arc::clone(&fetcher) as Arc<dyn ArchiveFetcher>,
        )
        .unwrap();

        let paths: Vec<PathBuf> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        cache
                            .get_or_fetch("a-B-1.0.0.zip", "https://repo.test/a")
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(paths.iter().all(|p| p == &paths[0]));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_keys_fetch_independently() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
        let cache = DownloadCache::new(
            dir.path().join("cache"),
            Arc::clone(&fetcher) as Arc<dyn ArchiveFetcher>,
        )
        .unwrap();

        cache.get_or_fetch("a-B-1.0.0.zip", "https://repo.test/a").unwrap();
        cache.get_or_fetch("c-D-2.0.0.zip", "https://repo.test/c").unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failure_is_tagged_with_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(dir.path().join("cache"), Arc::new(FailingFetcher)).unwrap();

        let err = cache
            .get_or_fetch("a-B-1.0.0.zip", "https://repo.test/a")
            .unwrap_err();
        match err {
            CacheError::Fetch { key, reason } => {
                assert_eq!(key, "a-B-1.0.0.zip");
                assert!(reason.contains("connection reset"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // A failed fetch leaves no entry behind.
        assert!(!cache.contains("a-B-1.0.0.zip"));
    }

    #[test]
    fn test_failed_key_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        let cache = DownloadCache::new(root.clone(), Arc::new(FailingFetcher)).unwrap();
        assert!(cache.get_or_fetch("a-B-1.0.0.zip", "url").is_err());

        // A later run with a working transport succeeds for the same key.
        let cache =
            DownloadCache::new(root, Arc::new(CountingFetcher::new(Duration::ZERO))).unwrap();
        assert!(cache.get_or_fetch("a-B-1.0.0.zip", "url").is_ok());
    }
}
