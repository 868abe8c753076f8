//! List command

use super::CommandError;
use crate::config::Context;
use crate::profile::ProfileStore;
use std::path::PathBuf;

/// Options for the list command
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Game identifier
    pub game: String,

    /// Game install directory, overriding the configured one
    pub game_dir: Option<PathBuf>,

    /// Profile name
    pub profile: String,
}

/// Print the packages recorded as installed in a profile
pub fn list(ctx: &Context, options: &ListOptions) -> Result<(), CommandError> {
    let game = ctx.config.game(&options.game, options.game_dir.clone())?;
    let store = ProfileStore::new(ctx.config.profiles_dir());
    let profile = store.load(&game, &options.profile)?;

    if profile.installed.is_empty() {
        println!("No packages installed in {}/{}.", game.identifier, profile.name);
        return Ok(());
    }

    for (key, manifest) in &profile.installed {
        println!("{} {}", key, manifest.version_number);
    }
    Ok(())
}
