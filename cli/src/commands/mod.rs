//! Command implementations

pub mod build;
pub mod export;
pub mod import;
pub mod launch;
pub mod list;
pub mod remove;
pub mod target;

use anyhow::{Context as _, Result, anyhow};

use crate::application::ports::BlobStoreVerifier;
use crate::domain::{BlobStoreError, DropletConfig};

/// Fail unless the configured droplet store answers and accepts the
/// configured credentials.
///
/// # Errors
///
/// Returns an error if no store is configured, the store is unreachable, or
/// it rejects the credentials.
pub async fn ensure_blob_store_verified(
    verifier: &impl BlobStoreVerifier,
    config: &DropletConfig,
) -> Result<()> {
    let store = config
        .blob_store
        .as_ref()
        .ok_or(BlobStoreError::NotConfigured)?;
    let authorized = verifier
        .verify(store)
        .await
        .context("verifying droplet store")?;
    if !authorized {
        return Err(anyhow!("unauthorized").context("verifying droplet store"));
    }
    Ok(())
}
