//! `droplet import-droplet <name> <droplet> <metadata>`: upload a droplet
//! exported from another store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::droplet_runner::import_droplet;

/// Arguments for the import-droplet command.
#[derive(Args)]
pub struct ImportArgs {
    /// Name to store the droplet under
    pub droplet_name: String,
    /// Path to the droplet archive (`.tgz`)
    pub droplet_path: PathBuf,
    /// Path to the staging metadata (`result.json`)
    pub metadata_path: PathBuf,
}

/// Run `droplet import-droplet`.
///
/// # Errors
///
/// Returns an error if either file cannot be read or uploaded.
pub async fn run(app: &AppContext, args: &ImportArgs) -> Result<()> {
    let config = app.load_config()?;
    let store = app.blob_store(&config).await?;

    import_droplet(&store, &args.droplet_name, &args.droplet_path, &args.metadata_path)
        .await
        .with_context(|| format!("importing {}", args.droplet_name))?;
    app.output.success(&format!("Imported {}", args.droplet_name));
    Ok(())
}
