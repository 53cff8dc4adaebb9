//! `droplet remove-droplet <name>`: delete a droplet from the store.

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::droplet_runner::remove_droplet;

/// Arguments for the remove-droplet command.
#[derive(Args)]
pub struct RemoveArgs {
    /// Droplet to remove
    pub droplet_name: String,
}

/// Run `droplet remove-droplet`.
///
/// # Errors
///
/// Returns an error if the droplet does not exist, an app still runs from
/// it, or a delete fails.
pub async fn run(app: &AppContext, args: &RemoveArgs) -> Result<()> {
    let config = app.load_config()?;
    let store = app.blob_store(&config).await?;
    let receptor = app.receptor(&config)?;

    remove_droplet(&store, &receptor, &args.droplet_name)
        .await
        .with_context(|| format!("removing droplet {}", args.droplet_name))?;
    app.output.success("Droplet removed");
    Ok(())
}
