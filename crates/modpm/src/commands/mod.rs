//! Client commands
//!
//! Implements the user-facing commands: install, uninstall, list.

pub mod install;
pub mod list;
pub mod uninstall;

pub use install::install;
pub use list::list;
pub use uninstall::uninstall;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::ident::IdentError;
use crate::installer::InstallerError;
use crate::manifest::ManifestError;
use crate::orchestrator::OrchestratorError;
use crate::profile::ProfileError;
use crate::registry::RegistryError;
use crate::resolver::ResolverError;
use thiserror::Error;

/// Errors that can surface from a command
#[derive(Debug, Error)]
pub enum CommandError {
    /// Identifier error
    #[error(transparent)]
    Ident(#[from] IdentError),

    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Repository error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Resolution error
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Fetch error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Installer error
    #[error(transparent)]
    Installer(#[from] InstallerError),

    /// Orchestration error
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// Profile error
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A local archive's namespace could not be determined
    #[error("Cannot determine a namespace for {0}: pass --namespace")]
    MissingNamespace(String),

    /// Uninstall target is not recorded in the profile
    #[error("Package {0} is not installed")]
    NotInstalled(String),
}
