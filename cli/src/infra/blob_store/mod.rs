//! Droplet store backends and the dispatch over the configured variant.

pub mod dav;
pub mod s3;

use anyhow::Result;

use crate::application::ports::{BlobReader, BlobStore};
use crate::domain::{Blob, BlobStoreConfig, RemoteAction};

pub use dav::DavBlobStore;
pub use s3::S3BlobStore;

/// Environment variable pointing S3 traffic at a compatible endpoint.
pub const S3_ENDPOINT_ENV: &str = "AWS_ENDPOINT_OVERRIDE";

/// The store selected by configuration.
pub enum AnyBlobStore {
    Dav(DavBlobStore),
    S3(S3BlobStore),
}

impl AnyBlobStore {
    /// Build the backend named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the DAV address is invalid.
    pub async fn connect(config: &BlobStoreConfig, s3_endpoint: Option<&str>) -> Result<Self> {
        Ok(match config {
            BlobStoreConfig::Dav(dav) => Self::Dav(DavBlobStore::new(dav.clone())?),
            BlobStoreConfig::S3(s3) => Self::S3(S3BlobStore::new(s3.clone(), s3_endpoint).await),
        })
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            AnyBlobStore::Dav($store) => $call,
            AnyBlobStore::S3($store) => $call,
        }
    };
}

impl BlobStore for AnyBlobStore {
    async fn list(&self) -> Result<Vec<Blob>> {
        dispatch!(self, store => store.list().await)
    }

    async fn upload(&self, path: &str, file: tokio::fs::File) -> Result<()> {
        dispatch!(self, store => store.upload(path, file).await)
    }

    async fn download(&self, path: &str) -> Result<BlobReader> {
        dispatch!(self, store => store.download(path).await)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        dispatch!(self, store => store.delete(path).await)
    }

    fn download_app_bits_action(&self, droplet_name: &str) -> RemoteAction {
        dispatch!(self, store => store.download_app_bits_action(droplet_name))
    }

    fn delete_app_bits_action(&self, droplet_name: &str) -> RemoteAction {
        dispatch!(self, store => store.delete_app_bits_action(droplet_name))
    }

    fn upload_droplet_action(&self, droplet_name: &str) -> RemoteAction {
        dispatch!(self, store => store.upload_droplet_action(droplet_name))
    }

    fn upload_droplet_metadata_action(&self, droplet_name: &str) -> RemoteAction {
        dispatch!(self, store => store.upload_droplet_metadata_action(droplet_name))
    }

    fn download_droplet_action(&self, droplet_name: &str) -> RemoteAction {
        dispatch!(self, store => store.download_droplet_action(droplet_name))
    }
}
