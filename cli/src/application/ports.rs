//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use tempfile::NamedTempFile;
use tokio::io::AsyncRead;

use crate::domain::{
    AppCreateRequest, AppInfo, Blob, BlobStoreConfig, DropletConfig, ProxyConf, RemoteAction,
    TaskInfo, TaskRequest,
};

/// Byte stream returned by blob downloads. The caller owns it.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

// ── Blob Store Port ───────────────────────────────────────────────────────────

/// Uniform operations over a droplet store backend, plus the actions the
/// cluster uses to reach the same blobs without going through this process.
#[allow(async_fn_in_trait)]
pub trait BlobStore {
    /// Every blob under the store root; backend pagination is exhausted.
    async fn list(&self) -> Result<Vec<Blob>>;
    /// Store `file` at `path`, overwriting any existing blob.
    async fn upload(&self, path: &str, file: tokio::fs::File) -> Result<()>;
    /// Open the blob at `path` for reading.
    async fn download(&self, path: &str) -> Result<BlobReader>;
    /// Remove the blob at `path`. Missing keys are backend-defined.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Fetch `<name>/bits.zip` and extract it into `/tmp/app`.
    fn download_app_bits_action(&self, droplet_name: &str) -> RemoteAction;
    /// Remove `<name>/bits.zip` once it has been fetched.
    fn delete_app_bits_action(&self, droplet_name: &str) -> RemoteAction;
    /// Store the built `/tmp/droplet` at `<name>/droplet.tgz`.
    fn upload_droplet_action(&self, droplet_name: &str) -> RemoteAction;
    /// Store `/tmp/result.json` at `<name>/result.json`.
    fn upload_droplet_metadata_action(&self, droplet_name: &str) -> RemoteAction;
    /// Fetch `<name>/droplet.tgz` and extract it into `/home/vcap`.
    fn download_droplet_action(&self, droplet_name: &str) -> RemoteAction;
}

/// Read-only reachability and authorization probe.
///
/// `Ok(false)` is a definite "credentials rejected"; `Err` means the store
/// could not be asked at all.
#[allow(async_fn_in_trait)]
pub trait BlobStoreVerifier {
    async fn verify(&self, config: &BlobStoreConfig) -> Result<bool>;
}

// ── Scheduler Ports ───────────────────────────────────────────────────────────

/// One-shot task submission.
#[allow(async_fn_in_trait)]
pub trait TaskRunner {
    async fn submit_task(&self, request: &TaskRequest) -> Result<()>;
}

/// Task status inspection.
#[allow(async_fn_in_trait)]
pub trait TaskExaminer {
    async fn task_status(&self, task_guid: &str) -> Result<TaskInfo>;
}

/// Long-running app submission.
#[allow(async_fn_in_trait)]
pub trait AppRunner {
    async fn create_app(&self, request: &AppCreateRequest) -> Result<()>;
}

/// Running app inspection.
#[allow(async_fn_in_trait)]
pub trait AppExaminer {
    async fn list_apps(&self) -> Result<Vec<AppInfo>>;
}

/// Composite trait: any type implementing all four sub-traits is a `Scheduler`.
pub trait Scheduler: TaskRunner + TaskExaminer + AppRunner + AppExaminer {}

/// Blanket implementation: any type implementing all four sub-traits is a `Scheduler`.
impl<T> Scheduler for T where T: TaskRunner + TaskExaminer + AppRunner + AppExaminer {}

// ── Collaborator Ports ────────────────────────────────────────────────────────

/// Supplies the cluster's proxy settings.
#[allow(async_fn_in_trait)]
pub trait ProxyConfReader {
    async fn proxy_conf(&self) -> Result<ProxyConf>;
}

/// Packages application bits. Sync trait, archiving is local file I/O.
pub trait Archiver {
    /// Whether `path` is a readable zip archive.
    fn is_zip_file(&self, path: &Path) -> bool;
    /// Zip the contents of `dir`, honouring its `.cfignore`. The archive is
    /// removed when the returned handle is dropped.
    fn zip(&self, dir: &Path) -> Result<NamedTempFile>;
    /// Extract `archive` into `dest`.
    fn unzip(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Time source for polling loops, so tests can run without real sleeps.
#[allow(async_fn_in_trait)]
pub trait Clock {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts config file I/O.
pub trait ConfigStore {
    /// Load configuration; a missing file yields the defaults.
    fn load(&self) -> Result<DropletConfig>;
    /// Persist configuration.
    fn save(&self, config: &DropletConfig) -> Result<()>;
    /// Location of the config file.
    fn path(&self) -> Result<PathBuf>;
}
