//! ModPM command line interface

use clap::{Parser, Subcommand};
use modpm::commands::install::InstallOptions;
use modpm::commands::list::ListOptions;
use modpm::commands::uninstall::UninstallOptions;
use modpm::{commands, Config, Context};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modpm")]
#[command(about = "Mod package manager", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package and its dependencies into a profile
    Install {
        /// Package identifier (namespace-name[-version]) or archive path
        target: String,

        /// Game identifier
        #[arg(long)]
        game: String,

        /// Game install directory (overrides the configured one)
        #[arg(long)]
        game_dir: Option<PathBuf>,

        /// Profile name
        #[arg(long, default_value = "default")]
        profile: String,

        /// Namespace for local archives whose manifest omits one
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Remove a package from a profile's installed record
    Uninstall {
        /// Package identifier (namespace-name)
        target: String,

        /// Game identifier
        #[arg(long)]
        game: String,

        /// Game install directory (overrides the configured one)
        #[arg(long)]
        game_dir: Option<PathBuf>,

        /// Profile name
        #[arg(long, default_value = "default")]
        profile: String,
    },
    /// List packages installed in a profile
    List {
        /// Game identifier
        #[arg(long)]
        game: String,

        /// Game install directory (overrides the configured one)
        #[arg(long)]
        game_dir: Option<PathBuf>,

        /// Profile name
        #[arg(long, default_value = "default")]
        profile: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = Context::new(config)?;

    match cli.command {
        Commands::Install {
            target,
            game,
            game_dir,
            profile,
            namespace,
        } => {
            commands::install(
                &ctx,
                &target,
                &InstallOptions {
                    game,
                    game_dir,
                    profile,
                    namespace,
                },
            )?;
        }
        Commands::Uninstall {
            target,
            game,
            game_dir,
            profile,
        } => {
            commands::uninstall(
                &ctx,
                &target,
                &UninstallOptions {
                    game,
                    game_dir,
                    profile,
                },
            )?;
        }
        Commands::List {
            game,
            game_dir,
            profile,
        } => {
            commands::list(
                &ctx,
                &ListOptions {
                    game,
                    game_dir,
                    profile,
                },
            )?;
        }
    }

    Ok(())
}
