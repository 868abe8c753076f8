//! External installer invocation
//!
//! Actual file placement into a game/profile directory is delegated to an
//! external installer executable. This module models that as a capability
//! trait so the orchestrator's ordering and abort logic can be tested with
//! fakes; the production implementation shells out.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{error, warn};

/// Errors that can occur while running the installer
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The installer executable could not be launched
    #[error("Failed to launch installer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The installer ran and reported failure
    #[error("Installer exited with status {status} for {archive}")]
    Failed { status: i32, archive: String },
}

/// Installs one archive into a game/profile directory
pub trait Installer {
    fn install(
        &self,
        game_dir: &Path,
        profile_dir: &Path,
        archive: &Path,
        namespace_backup: Option<&str>,
    ) -> Result<(), InstallerError>;
}

/// Production installer: one synchronous subprocess per archive.
///
/// Invoked as `install <gameDir> <profileDir> <archivePath>
/// [--namespace-backup <namespace>]`. Standard error is captured and
/// surfaced as a log regardless of exit code; the exit code alone decides
/// success. No timeout is imposed; a hung installer hangs the run.
pub struct SubprocessInstaller {
    program: PathBuf,
}

impl SubprocessInstaller {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

impl Installer for SubprocessInstaller {
    fn install(
        &self,
        game_dir: &Path,
        profile_dir: &Path,
        archive: &Path,
        namespace_backup: Option<&str>,
    ) -> Result<(), InstallerError> {
        let mut command = Command::new(&self.program);
        command
            .arg("install")
            .arg(game_dir)
            .arg(profile_dir)
            .arg(archive);
        if let Some(namespace) = namespace_backup {
            command.arg("--namespace-backup").arg(namespace);
        }

        let output = command.output().map_err(|source| InstallerError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            if output.status.success() {
                warn!(archive = %archive.display(), "installer: {stderr}");
            } else {
                error!(archive = %archive.display(), "installer: {stderr}");
            }
        }

        if !output.status.success() {
            return Err(InstallerError::Failed {
                status: output.status.code().unwrap_or(-1),
                archive: archive.display().to_string(),
            });
        }

        Ok(())
    }
}
