//! `droplet export-droplet <name>`: download a droplet and its metadata.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::BlobReader;
use crate::application::services::droplet_runner::{export_droplet, export_metadata};

/// Arguments for the export-droplet command.
#[derive(Args)]
pub struct ExportArgs {
    /// Droplet to export
    pub droplet_name: String,

    /// Directory to write `<name>.tgz` and `<name>-metadata.json` into
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
}

/// `<name>.tgz` and `<name>-metadata.json` under `dir`.
#[must_use]
pub fn export_paths(dir: &Path, droplet_name: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{droplet_name}.tgz")),
        dir.join(format!("{droplet_name}-metadata.json")),
    )
}

async fn write_to(mut reader: BlobReader, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("creating {}", path.display()))?;
    tokio::io::copy(&mut reader, &mut file)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Run `droplet export-droplet`.
///
/// # Errors
///
/// Returns an error if the droplet or its metadata cannot be fetched or
/// written.
pub async fn run(app: &AppContext, args: &ExportArgs) -> Result<()> {
    let config = app.load_config()?;
    let store = app.blob_store(&config).await?;
    let name = &args.droplet_name;
    let (droplet_file, metadata_file) = export_paths(&args.output_dir, name);

    let droplet = export_droplet(&store, name)
        .await
        .with_context(|| format!("exporting droplet {name}"))?;
    let metadata = export_metadata(&store, name)
        .await
        .with_context(|| format!("exporting metadata for {name}"))?;

    write_to(droplet, &droplet_file).await?;
    write_to(metadata, &metadata_file).await?;

    app.output.success(&format!(
        "Droplet '{name}' exported to {} and {}.",
        droplet_file.display(),
        metadata_file.display()
    ));
    Ok(())
}
