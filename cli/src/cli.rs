//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;
use crate::domain::{ConfigError, DropletError};

/// Build, launch and move application droplets on a lattice cluster
#[derive(Parser)]
#[command(
    name = "droplet",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Target a lattice cluster and its droplet store
    Target(commands::target::TargetArgs),

    /// List the droplets in the droplet store
    #[command(visible_alias = "lsd")]
    ListDroplets,

    /// Build app bits into a droplet using a CF buildpack
    #[command(visible_alias = "bd")]
    BuildDroplet(commands::build::BuildArgs),

    /// Launch a droplet as an app running on lattice
    #[command(visible_alias = "ld")]
    LaunchDroplet(commands::launch::LaunchArgs),

    /// Remove a droplet from the droplet store
    #[command(visible_alias = "rd")]
    RemoveDroplet(commands::remove::RemoveArgs),

    /// Import a droplet from disk to the droplet store
    #[command(visible_alias = "id")]
    ImportDroplet(commands::import::ImportArgs),

    /// Export a droplet from the droplet store to disk
    #[command(visible_alias = "ed")]
    ExportDroplet(commands::export::ExportArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            quiet,
            no_color,
            command,
        } = self;
        let app = AppContext::new(&OutputFlags { no_color, quiet });
        match command {
            Command::Target(args) => commands::target::run(&app, args, &app.verifier()).await,
            Command::ListDroplets => commands::list::run(&app).await,
            Command::BuildDroplet(args) => commands::build::run(&app, args).await,
            Command::LaunchDroplet(args) => commands::launch::run(&app, args).await,
            Command::RemoveDroplet(args) => commands::remove::run(&app, &args).await,
            Command::ImportDroplet(args) => commands::import::run(&app, &args).await,
            Command::ExportDroplet(args) => commands::export::run(&app, &args).await,
        }
    }
}

/// Process exit status for a failed command: 3 for droplet lifecycle
/// failures, 4 for invalid configuration or input, 1 otherwise. Usage errors
/// exit 2 from clap before a command runs.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if err.chain().any(|c| c.downcast_ref::<DropletError>().is_some()) {
        3
    } else if err.chain().any(|c| c.downcast_ref::<ConfigError>().is_some()) {
        4
    } else {
        1
    }
}
