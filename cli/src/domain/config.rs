//! Domain types and validators for droplet CLI configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

/// Port the cluster's DAV blob store and proxy-config endpoint listen on.
pub const DAV_BLOB_STORE_PORT: u16 = 8444;
pub const DEFAULT_S3_REGION: &str = "us-east-1";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.droplet/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DropletConfig {
    /// Cluster domain, e.g. `192.168.11.11.xip.io`.
    pub target: String,
    /// Scheduler and DAV login.
    pub username: String,
    pub password: String,
    /// The active droplet store; at most one backend at a time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_store: Option<BlobStoreConfig>,
    /// Extra buildpack aliases merged over the built-in catalog.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub buildpacks: BTreeMap<String, String>,
}

/// Connection settings for one of the two droplet store backends.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlobStoreConfig {
    Dav(DavConfig),
    S3(S3Config),
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DavConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Config {
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    DEFAULT_S3_REGION.to_string()
}

impl fmt::Debug for BlobStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dav(dav) => f.debug_tuple("Dav").field(dav).finish(),
            Self::S3(s3) => f.debug_tuple("S3").field(s3).finish(),
        }
    }
}

impl fmt::Debug for DavConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DavConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .finish()
    }
}

impl DropletConfig {
    /// The configured target.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoTarget`] when no target has been set.
    pub fn require_target(&self) -> Result<&str> {
        if self.target.is_empty() {
            return Err(ConfigError::NoTarget.into());
        }
        Ok(&self.target)
    }

    /// Point the droplet store at the cluster's DAV server using the login
    /// credentials. Replaces any S3 settings.
    pub fn use_dav_blob_store(&mut self) {
        self.blob_store = Some(BlobStoreConfig::Dav(DavConfig {
            host: self.target.clone(),
            port: DAV_BLOB_STORE_PORT,
            username: self.username.clone(),
            password: self.password.clone(),
        }));
    }

    /// Replaces any DAV settings.
    pub fn use_s3_blob_store(&mut self, s3: S3Config) {
        self.blob_store = Some(BlobStoreConfig::S3(s3));
    }

    /// Scheduler API endpoint for the target.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoTarget`] when no target has been set.
    pub fn receptor_url(&self) -> Result<String> {
        Ok(format!("http://receptor.{}", self.require_target()?))
    }
}

/// Validate S3 settings supplied on the command line.
///
/// # Errors
///
/// Returns [`ConfigError::MissingField`] for the first empty field.
pub fn validate_s3_config(s3: &S3Config) -> Result<()> {
    for (field, value) in [
        ("access key", &s3.access_key),
        ("secret key", &s3.secret_key),
        ("bucket name", &s3.bucket_name),
        ("region", &s3.region),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(field).into());
        }
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
