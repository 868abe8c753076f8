//! Install command
//!
//! Resolves the target identifier to a root manifest, builds the
//! dependency plan, and drives the orchestrator. The profile file is
//! rewritten when the run succeeded, or when a failure struck after some
//! installs were already recorded; a run that never got that far leaves
//! the prior on-disk state authoritative.

use super::CommandError;
use crate::config::Context;
use crate::ident::{PackageIdent, PackageReference};
use crate::installer::SubprocessInstaller;
use crate::manifest::PackageManifest;
use crate::orchestrator::{InstallObserver, InstallOrchestrator, RootArchive, RootInstall};
use crate::profile::ProfileStore;
use crate::registry::Registry;
use crate::resolver::DependencyResolver;
use crate::semver::Version;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Options for the install command
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Game identifier
    pub game: String,

    /// Game install directory, overriding the configured one
    pub game_dir: Option<PathBuf>,

    /// Profile name
    pub profile: String,

    /// Namespace for local archives whose manifest omits one
    pub namespace: Option<String>,
}

/// Prints progress the way the terminal user expects it
struct ConsoleObserver;

impl InstallObserver for ConsoleObserver {
    fn fetch_progress(&self, completed: usize, total: usize) {
        println!("  Downloaded {}/{}", completed, total);
    }

    fn installed(&self, key: &str, version: &Version) {
        println!("  Installed {}-{}", key, version);
    }
}

/// Install a package and its dependency closure into a profile
pub fn install(ctx: &Context, target: &str, options: &InstallOptions) -> Result<(), CommandError> {
    let game = ctx.config.game(&options.game, options.game_dir.clone())?;
    let store = ProfileStore::new(ctx.config.profiles_dir());
    let mut profile = store.load(&game, &options.profile)?;

    let (root_manifest, root_archive) = match PackageIdent::parse(target)? {
        PackageIdent::LocalArchive(path) => {
            let manifest = local_manifest(&path, options.namespace.as_deref())?;
            (manifest, RootArchive::Local(path))
        }
        PackageIdent::Remote(reference) => {
            let document = match &reference.version {
                Some(version) => {
                    ctx.registry
                        .get_version(&reference.namespace, &reference.name, version)?
                }
                None => {
                    ctx.registry
                        .get_package(&reference.namespace, &reference.name)?
                        .latest_version
                }
            };
            let url = document.download_url.clone();
            let manifest = document.into_manifest(&reference.namespace);
            (manifest, RootArchive::Remote { url })
        }
    };

    println!(
        "Installing {} into {}/{}...",
        root_manifest.full_name(),
        game.identifier,
        profile.name
    );

    let installed_keys: HashSet<String> = profile.installed.keys().cloned().collect();
    let resolver = DependencyResolver::new(&ctx.registry);
    let plan = resolver.resolve(&root_manifest, &installed_keys)?;
    if !plan.is_empty() {
        println!("Resolved {} dependencies", plan.len());
    }

    let installer = SubprocessInstaller::new(ctx.config.installer.clone());
    let observer = ConsoleObserver;
    let orchestrator = InstallOrchestrator::new(&ctx.cache, &installer, &observer);

    let root = RootInstall {
        manifest: root_manifest,
        archive: root_archive,
    };

    match orchestrator.install_all(plan, root, &mut profile, &game) {
        Ok(report) => {
            store.persist(&game, &profile)?;
            if report.installed == 0 {
                println!("Already installed, nothing to do.");
            } else {
                println!(
                    "Installed {} package(s) ({} already present)",
                    report.installed, report.skipped
                );
            }
            Ok(())
        }
        Err(err) => {
            // Installs recorded before the failure stay recorded.
            if err.installed() > 0 {
                store.persist(&game, &profile)?;
            }
            Err(err.into())
        }
    }
}

/// Read a local archive's embedded manifest and settle its namespace:
/// explicit flag, then the manifest's own field, then the archive
/// filename's `namespace-name-version` pattern.
fn local_manifest(
    path: &Path,
    namespace: Option<&str>,
) -> Result<PackageManifest, CommandError> {
    let mut manifest = PackageManifest::from_archive(path)?;

    if let Some(namespace) = namespace {
        manifest.backfill_namespace(namespace);
    }
    if manifest.namespace.is_none() {
        if let Some(reference) = filename_reference(path) {
            manifest.backfill_namespace(&reference.namespace);
        }
    }
    if manifest.namespace.is_none() {
        return Err(CommandError::MissingNamespace(path.display().to_string()));
    }

    Ok(manifest)
}

/// Parse an archive filename like `author-ModA-1.0.0.zip` into a reference
fn filename_reference(path: &Path) -> Option<PackageReference> {
    let stem = path.file_stem()?.to_str()?;
    PackageReference::parse(stem).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_archive(path: &Path, manifest_json: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("manifest.json", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(manifest_json.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_local_manifest_prefers_flag_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("author-ModA-1.0.0.zip");
        write_archive(&path, r#"{"name": "ModA", "versionNumber": "1.0.0"}"#);

        let manifest = local_manifest(&path, Some("flagged")).unwrap();
        assert_eq!(manifest.namespace.as_deref(), Some("flagged"));
    }

    #[test]
    fn test_local_manifest_falls_back_to_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("author-ModA-1.0.0.zip");
        write_archive(&path, r#"{"name": "ModA", "versionNumber": "1.0.0"}"#);

        let manifest = local_manifest(&path, None).unwrap();
        assert_eq!(manifest.namespace.as_deref(), Some("author"));
    }

    #[test]
    fn test_local_manifest_keeps_embedded_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renamed.zip");
        write_archive(
            &path,
            r#"{"namespace": "embedded", "name": "ModA", "versionNumber": "1.0.0"}"#,
        );

        let manifest = local_manifest(&path, None).unwrap();
        assert_eq!(manifest.namespace.as_deref(), Some("embedded"));
    }

    #[test]
    fn test_local_manifest_without_any_namespace_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renamed.zip");
        write_archive(&path, r#"{"name": "ModA", "versionNumber": "1.0.0"}"#);

        let result = local_manifest(&path, None);
        assert!(matches!(result, Err(CommandError::MissingNamespace(_))));
    }
}
