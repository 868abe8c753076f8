//! ModPM library
//!
//! This crate provides the mod package management core, including:
//! - Package identifier parsing (local archives and remote references)
//! - Repository metadata client
//! - Cache-aware, deduplicated archive fetching
//! - Transitive dependency resolution into a topological plan
//! - Ordered installation through the external installer
//! - Per-profile installed-version tracking

pub mod cache;
pub mod commands;
pub mod config;
pub mod ident;
pub mod installer;
pub mod manifest;
pub mod orchestrator;
pub mod profile;
pub mod registry;
pub mod resolver;
pub mod semver;

pub use cache::{ArchiveFetcher, CacheError, DownloadCache, HttpArchiveFetcher};
pub use commands::CommandError;
pub use config::{Config, ConfigError, Context};
pub use ident::{IdentError, PackageIdent, PackageReference};
pub use installer::{Installer, InstallerError, SubprocessInstaller};
pub use manifest::{ManifestError, PackageManifest, MANIFEST_ENTRY};
pub use orchestrator::{
    InstallObserver, InstallOrchestrator, InstallReport, NoopObserver, OrchestratorError,
    RootArchive, RootInstall,
};
pub use profile::{GameDefinition, ModProfile, ProfileError, ProfileStore};
pub use registry::{
    PackageMetadataDocument, PackageVersionDocument, Registry, RegistryClient, RegistryError,
};
pub use resolver::{DependencyResolver, PlanEntry, ResolverError};
pub use semver::{SemverError, Version};
