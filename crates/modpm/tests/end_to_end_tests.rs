//! End-to-end tests for the complete install workflow: resolution against
//! a fake repository, cache-backed fetching, and ordered installation.

use modpm::{
    ArchiveFetcher, DependencyResolver, DownloadCache, GameDefinition, InstallOrchestrator,
    Installer, InstallerError, ModProfile, NoopObserver, PackageManifest, PackageMetadataDocument,
    PackageReference, PackageVersionDocument, Registry, RegistryError, RootArchive, RootInstall,
    Version,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory repository fixture
struct FakeRegistry {
    versions: Vec<PackageVersionDocument>,
}

impl Registry for FakeRegistry {
    fn get_package(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PackageMetadataDocument, RegistryError> {
        let latest = self
            .versions
            .iter()
            .filter(|v| v.namespace.as_deref() == Some(namespace) && v.name == name)
            .max_by_key(|v| v.version_number)
            .cloned()
            .ok_or_else(|| RegistryError::PackageNotFound(format!("{}-{}", namespace, name)))?;

        Ok(PackageMetadataDocument {
            namespace: namespace.to_string(),
            name: name.to_string(),
            latest_version: latest,
            community_listings: Vec::new(),
        })
    }

    fn get_version(
        &self,
        namespace: &str,
        name: &str,
        version: &Version,
    ) -> Result<PackageVersionDocument, RegistryError> {
        self.versions
            .iter()
            .find(|v| {
                v.namespace.as_deref() == Some(namespace)
                    && v.name == name
                    && v.version_number == *version
            })
            .cloned()
            .ok_or_else(|| RegistryError::VersionNotFound {
                package: format!("{}-{}", namespace, name),
                version: version.to_string(),
            })
    }
}

fn doc(namespace: &str, name: &str, version: &str, deps: &[&str]) -> PackageVersionDocument {
    PackageVersionDocument {
        namespace: Some(namespace.to_string()),
        name: name.to_string(),
        version_number: Version::parse(version).unwrap(),
        download_url: format!("https://repo.test/{}/{}/{}.zip", namespace, name, version),
        file_size: 0,
        dependencies: deps
            .iter()
            .map(|d| PackageReference::parse(d).unwrap())
            .collect(),
        owner: None,
    }
}

struct CountingFetcher {
    calls: AtomicUsize,
}

impl ArchiveFetcher for CountingFetcher {
    fn fetch(&self, _url: &str, dest: &Path) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(dest, b"archive bytes")
    }
}

#[derive(Default)]
struct RecordingInstaller {
    installed: Mutex<Vec<String>>,
}

impl Installer for RecordingInstaller {
    fn install(
        &self,
        _game_dir: &Path,
        _profile_dir: &Path,
        archive: &Path,
        _namespace_backup: Option<&str>,
    ) -> Result<(), InstallerError> {
        self.installed
            .lock()
            .push(archive.file_name().unwrap().to_string_lossy().into_owned());
        Ok(())
    }
}

/// Resolve a remote target against the registry and install it
fn run_install(
    registry: &FakeRegistry,
    target: &str,
    profile: &mut ModProfile,
) -> (Vec<String>, usize) {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(CountingFetcher {
        calls: AtomicUsize::new(0),
    });
    let cache = DownloadCache::new(
        dir.path().join("cache"),
        Arc::clone(&fetcher) as Arc<dyn ArchiveFetcher>,
    )
    .unwrap();
    let game = GameDefinition {
        identifier: "somegame".into(),
        install_dir: dir.path().join("game"),
    };

    let reference = PackageReference::parse(target).unwrap();
    let document = match &reference.version {
        Some(version) => registry
            .get_version(&reference.namespace, &reference.name, version)
            .unwrap(),
        None => {
            registry
                .get_package(&reference.namespace, &reference.name)
                .unwrap()
                .latest_version
        }
    };
    let url = document.download_url.clone();
    let root_manifest: PackageManifest = document.into_manifest(&reference.namespace);

    let installed_keys: HashSet<String> = profile.installed.keys().cloned().collect();
    let resolver = DependencyResolver::new(registry);
    let plan = resolver.resolve(&root_manifest, &installed_keys).unwrap();

    let installer = RecordingInstaller::default();
    let orchestrator = InstallOrchestrator::new(&cache, &installer, &NoopObserver);
    orchestrator
        .install_all(
            plan,
            RootInstall {
                manifest: root_manifest,
                archive: RootArchive::Remote { url },
            },
            profile,
            &game,
        )
        .unwrap();

    let installed = installer.installed.lock().clone();
    (
        installed,
        fetcher.calls.load(Ordering::SeqCst),
    )
}

#[test]
fn test_install_without_dependencies() {
    let registry = FakeRegistry {
        versions: vec![doc("author", "ModA", "1.0.0", &[])],
    };
    let mut profile = ModProfile::new("default", std::env::temp_dir());

    let (installed, _fetches) = run_install(&registry, "author-ModA", &mut profile);

    // Exactly one installer invocation, one new profile entry.
    assert_eq!(installed, vec!["author-ModA-1.0.0.zip"]);
    assert_eq!(profile.installed.len(), 1);
    assert!(profile.is_installed("author-ModA"));
}

#[test]
fn test_install_with_shared_transitive_dependency() {
    // ModA depends on Lib and Helper; Helper also depends on Lib. Lib is
    // installed first and fetched exactly once.
    let registry = FakeRegistry {
        versions: vec![
            doc(
                "author",
                "ModA",
                "1.0.0",
                &["other-Lib-2.0.0", "tools-Helper-1.0.0"],
            ),
            doc("other", "Lib", "2.0.0", &[]),
            doc("tools", "Helper", "1.0.0", &["other-Lib-2.0.0"]),
        ],
    };
    let mut profile = ModProfile::new("default", std::env::temp_dir());

    let (installed, fetches) = run_install(&registry, "author-ModA-1.0.0", &mut profile);

    assert_eq!(installed.len(), 3);
    assert_eq!(installed.last().unwrap(), "author-ModA-1.0.0.zip");
    let lib = installed
        .iter()
        .position(|n| n == "other-Lib-2.0.0.zip")
        .unwrap();
    let helper = installed
        .iter()
        .position(|n| n == "tools-Helper-1.0.0.zip")
        .unwrap();
    assert!(lib < helper, "Lib must install before Helper");

    // Three distinct archives, three fetches: Lib was not re-fetched for
    // its second requirer.
    assert_eq!(fetches, 3);
}

#[test]
fn test_two_package_install_order() {
    let registry = FakeRegistry {
        versions: vec![
            doc("author", "ModA", "1.0.0", &["other-Lib-2.0.0"]),
            doc("other", "Lib", "2.0.0", &[]),
        ],
    };
    let mut profile = ModProfile::new("default", std::env::temp_dir());

    let (installed, _) = run_install(&registry, "author-ModA-1.0.0", &mut profile);

    assert_eq!(
        installed,
        vec!["other-Lib-2.0.0.zip", "author-ModA-1.0.0.zip"]
    );
    assert!(profile.is_installed("other-Lib"));
    assert!(profile.is_installed("author-ModA"));
}

#[test]
fn test_reinstall_of_fully_installed_package_is_a_noop() {
    let registry = FakeRegistry {
        versions: vec![
            doc("author", "ModA", "1.0.0", &["other-Lib-2.0.0"]),
            doc("other", "Lib", "2.0.0", &[]),
        ],
    };
    let mut profile = ModProfile::new("default", std::env::temp_dir());

    run_install(&registry, "author-ModA-1.0.0", &mut profile);
    let (installed, fetches) = run_install(&registry, "author-ModA-1.0.0", &mut profile);

    assert!(installed.is_empty());
    assert_eq!(fetches, 0);
    assert_eq!(profile.installed.len(), 2);
}

#[test]
fn test_version_conflict_resolves_to_maximum() {
    let registry = FakeRegistry {
        versions: vec![
            doc(
                "author",
                "ModA",
                "1.0.0",
                &["a-First-1.0.0", "b-Second-1.0.0"],
            ),
            doc("a", "First", "1.0.0", &["c-Shared-1.0.0"]),
            doc("b", "Second", "1.0.0", &["c-Shared-2.0.0"]),
            doc("c", "Shared", "1.0.0", &[]),
            doc("c", "Shared", "2.0.0", &[]),
        ],
    };
    let mut profile = ModProfile::new("default", std::env::temp_dir());

    let (installed, _) = run_install(&registry, "author-ModA-1.0.0", &mut profile);

    assert_eq!(
        installed
            .iter()
            .filter(|n| n.starts_with("c-Shared"))
            .count(),
        1
    );
    assert!(installed.contains(&"c-Shared-2.0.0.zip".to_string()));
    assert_eq!(
        profile.installed_version("c-Shared"),
        Some(Version::new(2, 0, 0))
    );
}
