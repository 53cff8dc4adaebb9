//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod buildpack;
pub mod config;
pub mod droplet;
pub mod error;
pub mod ignore;
pub mod proxy;
pub mod remote;
pub mod scheduler;
pub mod staging;

pub use buildpack::BuildpackCatalog;
pub use config::{BlobStoreConfig, DavConfig, DropletConfig, S3Config};
pub use droplet::{Blob, Droplet};
pub use error::{BlobStoreError, ConfigError, DropletError};
pub use ignore::CfIgnore;
pub use proxy::ProxyConf;
pub use remote::RemoteAction;
pub use scheduler::{AppCreateRequest, AppEnvironmentParams, AppInfo, TaskInfo, TaskRequest};
pub use staging::StagingResult;
