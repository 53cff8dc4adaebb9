//! `droplet list-droplets`: show the droplets in the store, newest first.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::app::AppContext;
use crate::application::services::droplet_runner::list_droplets;
use crate::commands::ensure_blob_store_verified;
use crate::domain::Droplet;
use crate::domain::droplet::sort_newest_first;

/// Run `droplet list-droplets`.
///
/// # Errors
///
/// Returns an error if the store cannot be verified or listed.
pub async fn run(app: &AppContext) -> Result<()> {
    let config = app.load_config()?;
    ensure_blob_store_verified(&app.verifier(), &config).await?;
    let store = app.blob_store(&config).await?;

    let mut droplets = list_droplets(&store).await?;
    sort_newest_first(&mut droplets);

    app.output.table(HEADING, &rows(&droplets));
    Ok(())
}

const HEADING: [&str; 3] = ["Droplet", "Created At", "Size"];

/// One table row per droplet. A droplet without a creation time gets an
/// empty cell.
#[must_use]
pub fn rows(droplets: &[Droplet]) -> Vec<[String; 3]> {
    droplets
        .iter()
        .map(|d| {
            [
                d.name.clone(),
                d.created.map(format_created).unwrap_or_default(),
                format_size(d.size),
            ]
        })
        .collect()
}

/// `MM/DD hh:mm:ss.cc`.
#[must_use]
pub fn format_created(created: DateTime<Utc>) -> String {
    let centis = created.timestamp_subsec_millis() / 10;
    format!("{}.{centis:02}", created.format("%m/%d %H:%M:%S"))
}

/// Human-readable size with a one-letter binary unit, e.g. `1.5M`.
#[must_use]
#[allow(clippy::cast_precision_loss)] // display only
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(1 << 40, "T"), (1 << 30, "G"), (1 << 20, "M"), (1 << 10, "K")];
    if bytes == 0 {
        return "0".to_string();
    }
    for (unit, suffix) in UNITS {
        if bytes >= unit {
            let value = format!("{:.1}", bytes as f64 / unit as f64);
            return format!("{}{suffix}", value.trim_end_matches(".0"));
        }
    }
    format!("{bytes}B")
}
