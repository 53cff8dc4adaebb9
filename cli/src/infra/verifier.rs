//! Read-only probes that check a droplet store answers and accepts the
//! configured credentials.

use anyhow::{Context, Result};
use reqwest::StatusCode;

use crate::application::ports::BlobStoreVerifier;
use crate::domain::{BlobStoreConfig, BlobStoreError, DavConfig, S3Config};
use crate::infra::blob_store::dav::DavBlobStore;
use crate::infra::blob_store::s3;

/// Verifies either backend variant.
#[derive(Debug, Default)]
pub struct StoreVerifier {
    s3_endpoint: Option<String>,
}

impl StoreVerifier {
    /// `s3_endpoint` replaces the AWS endpoint, for S3-compatible stores.
    #[must_use]
    pub fn new(s3_endpoint: Option<String>) -> Self {
        Self { s3_endpoint }
    }
}

impl BlobStoreVerifier for StoreVerifier {
    async fn verify(&self, config: &BlobStoreConfig) -> Result<bool> {
        let authorized = match config {
            BlobStoreConfig::Dav(dav) => verify_dav(dav).await,
            BlobStoreConfig::S3(s3) => verify_s3(s3, self.s3_endpoint.as_deref()).await,
        };
        match &authorized {
            Ok(ok) => tracing::debug!(authorized = ok, "droplet store verified"),
            Err(e) => tracing::debug!(error = %e, "droplet store unreachable"),
        }
        authorized
    }
}

/// Depth-1 PROPFIND against the store root. Any 2xx (including 207
/// Multi-Status) is authorized, 401/403 is a definite refusal, anything else
/// is an error.
///
/// # Errors
///
/// Returns an error on transport failure or an unexpected status.
pub async fn verify_dav(config: &DavConfig) -> Result<bool> {
    let store = DavBlobStore::new(config.clone())?;
    let status = store.probe().await?;
    match status {
        s if s.is_success() => Ok(true),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
        s => Err(BlobStoreError::UnexpectedStatus {
            method: "PROPFIND".to_string(),
            path: "/blobs/".to_string(),
            status: s.as_u16(),
        }
        .into()),
    }
}

/// List at most one key from the bucket. S3 reports bad credentials and
/// unreachable endpoints the same way, so every failure is an error.
///
/// # Errors
///
/// Returns an error if the bucket cannot be listed.
pub async fn verify_s3(config: &S3Config, endpoint: Option<&str>) -> Result<bool> {
    let client = s3::connect(config, endpoint).await;
    client
        .list_objects_v2()
        .bucket(&config.bucket_name)
        .max_keys(1)
        .send()
        .await
        .with_context(|| format!("listing bucket {}", config.bucket_name))?;
    Ok(true)
}
