//! Uninstall command
//!
//! Drops a package from the profile's installed record. File removal from
//! the profile directory is the external installer's territory and stays
//! out of scope here; the record is what resolution and reinstalls consult.

use super::CommandError;
use crate::config::Context;
use crate::ident::PackageReference;
use crate::profile::ProfileStore;
use std::path::PathBuf;

/// Options for the uninstall command
#[derive(Debug, Clone)]
pub struct UninstallOptions {
    /// Game identifier
    pub game: String,

    /// Game install directory, overriding the configured one
    pub game_dir: Option<PathBuf>,

    /// Profile name
    pub profile: String,
}

/// Remove a package from a profile's installed record
pub fn uninstall(
    ctx: &Context,
    target: &str,
    options: &UninstallOptions,
) -> Result<(), CommandError> {
    let reference = PackageReference::parse(target)?;
    let game = ctx.config.game(&options.game, options.game_dir.clone())?;
    let store = ProfileStore::new(ctx.config.profiles_dir());
    let mut profile = store.load(&game, &options.profile)?;

    let key = reference.key();
    match profile.remove(&key) {
        Some(manifest) => {
            store.persist(&game, &profile)?;
            println!("Removed {} from {}/{}", manifest.full_name(), game.identifier, profile.name);
            Ok(())
        }
        None => Err(CommandError::NotInstalled(key)),
    }
}
