//! Droplet lifecycle use-cases: build, launch, remove, import, export, list.
//!
//! Droplet state lives only in the blob store (by path convention) and in
//! app annotations on the cluster. Nothing is tracked locally.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use droplet_common::{Action, bits_path, droplet_path, result_path};
use tokio::io::AsyncReadExt as _;

use crate::application::ports::{
    AppExaminer, AppRunner, Archiver, BlobReader, BlobStore, ProgressReporter, ProxyConfReader,
    TaskRunner,
};
use crate::domain::droplet::{
    DropletAnnotation, annotated_droplet, blobs_for_droplet, droplets_from_blobs,
    validate_droplet_name,
};
use crate::domain::scheduler::{DOMAIN, DROPLET_ROOTFS, DROPLET_STACK, EnvironmentVariable};
use crate::domain::staging::launch_command;
use crate::domain::{
    AppCreateRequest, AppEnvironmentParams, Droplet, DropletError, ProxyConf, RemoteAction,
    StagingResult, TaskRequest,
};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Helper binaries (`davtool`, `s3tool`, `launcher`) unpacked into `/tmp`.
pub const CELL_HELPERS_URL: &str =
    "http://file-server.service.cf.internal:8080/v1/static/cell-helpers/cell-helpers.tgz";
/// The buildpack `builder` unpacked into `/tmp`.
pub const BUILDPACK_LIFECYCLE_URL: &str = "http://file-server.service.cf.internal:8080/v1/static/buildpack_app_lifecycle/buildpack_app_lifecycle.tgz";

const BUILD_LOG_SOURCE: &str = "BUILD";
const HOME_DIR: &str = "/home/vcap";

// ── List ──────────────────────────────────────────────────────────────────────

/// Complete droplets in the store, in name order.
///
/// # Errors
///
/// Returns an error if the store listing fails.
pub async fn list_droplets(store: &impl BlobStore) -> Result<Vec<Droplet>> {
    let blobs = store.list().await.context("listing droplet store")?;
    Ok(droplets_from_blobs(&blobs))
}

// ── Build ─────────────────────────────────────────────────────────────────────

/// Inputs to a droplet build.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub task_name: &'a str,
    pub droplet_name: &'a str,
    pub buildpack_url: &'a str,
    /// Directory or zip archive holding the application source.
    pub source: &'a Path,
    pub environment: &'a BTreeMap<String, String>,
    pub memory_mb: u32,
    pub cpu_weight: u32,
    pub disk_mb: u32,
}

/// Upload an existing archive as `<name>/bits.zip`.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or the upload fails.
pub async fn upload_bits(
    store: &impl BlobStore,
    droplet_name: &str,
    archive: &Path,
) -> Result<()> {
    let file = tokio::fs::File::open(archive)
        .await
        .with_context(|| format!("opening {}", archive.display()))?;
    let path = bits_path(droplet_name);
    store
        .upload(&path, file)
        .await
        .with_context(|| format!("uploading {path}"))
}

/// Package `source` into a fresh zip. A source that is already a zip is
/// extracted and re-zipped so ignore rules apply either way.
///
/// # Errors
///
/// Returns an error if extraction or archiving fails.
pub fn package_bits(archiver: &impl Archiver, source: &Path) -> Result<tempfile::NamedTempFile> {
    if archiver.is_zip_file(source) {
        let scratch = tempfile::Builder::new()
            .prefix("rezip")
            .tempdir()
            .context("creating re-archive directory")?;
        archiver
            .unzip(source, scratch.path())
            .with_context(|| format!("unarchiving {}", source.display()))?;
        return archiver
            .zip(scratch.path())
            .with_context(|| format!("re-archiving {}", source.display()));
    }
    archiver
        .zip(source)
        .with_context(|| format!("archiving {}", source.display()))
}

/// Package and upload the bits, then submit the build task.
///
/// The proxy settings are resolved before submission; if that fails no
/// task is created. Completion is not awaited here (see
/// [`crate::application::services::poll::wait_for_build`]).
///
/// # Errors
///
/// Returns an error from packaging, upload, proxy resolution or submission.
pub async fn build_droplet(
    store: &impl BlobStore,
    archiver: &impl Archiver,
    proxy: &impl ProxyConfReader,
    tasks: &impl TaskRunner,
    reporter: &impl ProgressReporter,
    request: &BuildRequest<'_>,
) -> Result<()> {
    validate_droplet_name(request.droplet_name)?;

    let archive = package_bits(archiver, request.source)?;
    reporter.step("Uploading application bits...");
    upload_bits(store, request.droplet_name, archive.path()).await?;
    reporter.success("Uploaded.");
    drop(archive);

    let proxy_conf = proxy.proxy_conf().await.context("reading proxy configuration")?;
    let task = build_task_request(store, request, &proxy_conf);

    tracing::info!(task = %task.task_guid, droplet = %request.droplet_name, "submitting build task");
    tasks
        .submit_task(&task)
        .await
        .with_context(|| format!("submitting build of {}", request.droplet_name))
}

/// Compose the build task: fetch tools and bits, drop the remote bits copy,
/// stage with the buildpack, store the droplet and its metadata.
#[must_use]
pub fn build_task_request(
    store: &impl BlobStore,
    request: &BuildRequest<'_>,
    proxy_conf: &ProxyConf,
) -> TaskRequest {
    let name = request.droplet_name;
    let remote = [
        store.download_app_bits_action(name),
        store.delete_app_bits_action(name),
        store.upload_droplet_action(name),
        store.upload_droplet_metadata_action(name),
    ];
    for action in &remote {
        tracing::debug!(action = %action.describe(), "build step");
    }
    let [download_bits, delete_bits, upload_droplet, upload_metadata] =
        remote.map(RemoteAction::into_action);

    let builder_args = [
        "-buildArtifactsCacheDir=/tmp/cache".to_string(),
        "-buildDir=/tmp/app".to_string(),
        format!("-buildpackOrder={}", request.buildpack_url),
        "-buildpacksDir=/tmp/buildpacks".to_string(),
        "-outputBuildArtifactsCache=/tmp/output-cache".to_string(),
        "-outputDroplet=/tmp/droplet".to_string(),
        "-outputMetadata=/tmp/result.json".to_string(),
        "-skipCertVerify=false".to_string(),
        "-skipDetect=true".to_string(),
    ];

    let action = Action::serial(vec![
        Action::download(CELL_HELPERS_URL, "/tmp"),
        Action::download(BUILDPACK_LIFECYCLE_URL, "/tmp"),
        download_bits,
        delete_bits,
        Action::run("/bin/chmod", ["-R", "a+X", "."]).in_dir("/tmp/app"),
        Action::run("/tmp/builder", builder_args).in_dir("/"),
        upload_droplet,
        upload_metadata,
    ]);

    let mut environment = vec![
        EnvironmentVariable::new("CF_STACK", DROPLET_STACK),
        EnvironmentVariable::new("MEMORY_LIMIT", format!("{}M", request.memory_mb)),
    ];
    environment.extend(
        request
            .environment
            .iter()
            .map(|(k, v)| EnvironmentVariable::new(k, v)),
    );
    environment.extend(
        proxy_conf
            .env_vars()
            .into_iter()
            .map(|(k, v)| EnvironmentVariable::new(k, v)),
    );

    TaskRequest {
        task_guid: request.task_name.to_string(),
        log_guid: request.task_name.to_string(),
        metrics_guid: request.task_name.to_string(),
        domain: DOMAIN.to_string(),
        rootfs: DROPLET_ROOTFS.to_string(),
        environment,
        cpu_weight: request.cpu_weight,
        memory_mb: request.memory_mb,
        disk_mb: request.disk_mb,
        log_source: BUILD_LOG_SOURCE.to_string(),
        privileged: true,
        egress_rules: Vec::new(),
        action,
    }
}

// ── Launch ────────────────────────────────────────────────────────────────────

/// Inputs to a droplet launch.
#[derive(Debug, Clone)]
pub struct LaunchRequest<'a> {
    pub app_name: &'a str,
    pub droplet_name: &'a str,
    /// Overrides the buildpack's start command when non-empty.
    pub start_command: &'a str,
    pub start_args: &'a [String],
}

/// Start a long-running app from a droplet.
///
/// # Errors
///
/// Returns an error if `result.json` cannot be fetched or parsed, no start
/// command can be derived, proxy resolution fails, or submission fails.
pub async fn launch_droplet(
    store: &impl BlobStore,
    proxy: &impl ProxyConfReader,
    apps: &impl AppRunner,
    request: &LaunchRequest<'_>,
    mut params: AppEnvironmentParams,
) -> Result<()> {
    let LaunchRequest {
        app_name,
        droplet_name,
        start_command,
        start_args,
    } = *request;

    let metadata_path = result_path(droplet_name);
    let raw = read_blob(store, &metadata_path)
        .await
        .with_context(|| format!("downloading {metadata_path}"))?;
    let staging = StagingResult::parse(&raw)?;
    let command = launch_command(&staging, start_command, start_args)?;

    let proxy_conf = proxy.proxy_conf().await.context("reading proxy configuration")?;
    params
        .environment
        .insert("PWD".to_string(), HOME_DIR.to_string());
    params
        .environment
        .insert("TMPDIR".to_string(), format!("{HOME_DIR}/tmp"));
    for (key, value) in proxy_conf.env_vars() {
        params.environment.insert(key.to_string(), value);
    }

    let setup = Action::serial(vec![
        Action::download(CELL_HELPERS_URL, "/tmp"),
        store.download_droplet_action(droplet_name).into_action(),
    ])
    .with_log_source(app_name);

    let create = AppCreateRequest {
        name: app_name.to_string(),
        rootfs: DROPLET_ROOTFS.to_string(),
        start_command: command.path,
        app_args: command.args,
        working_dir: HOME_DIR.to_string(),
        annotation: DropletAnnotation::new(droplet_name).to_json()?,
        setup,
        params,
    };

    tracing::info!(app = %app_name, droplet = %droplet_name, "creating app");
    apps.create_app(&create)
        .await
        .with_context(|| format!("creating app {app_name}"))
}

// ── Remove ────────────────────────────────────────────────────────────────────

/// Delete every blob of a droplet, unless a running app was launched from it.
///
/// # Errors
///
/// Returns [`DropletError::NotFound`] when no blob carries the name,
/// [`DropletError::InUse`] naming the first app launched from it, or the
/// first failed delete (earlier deletes are not rolled back).
pub async fn remove_droplet(
    store: &impl BlobStore,
    apps: &impl AppExaminer,
    droplet_name: &str,
) -> Result<()> {
    let blobs = store.list().await.context("listing droplet store")?;
    let owned = blobs_for_droplet(&blobs, droplet_name);
    if owned.is_empty() {
        return Err(DropletError::NotFound.into());
    }

    let running = apps.list_apps().await.context("listing running apps")?;
    if let Some(app) = running
        .iter()
        .find(|app| annotated_droplet(&app.annotation).as_deref() == Some(droplet_name))
    {
        return Err(DropletError::InUse {
            app: app.process_guid.clone(),
        }
        .into());
    }

    for blob in owned {
        tracing::info!(path = %blob.path, "deleting blob");
        store
            .delete(&blob.path)
            .await
            .with_context(|| format!("deleting {}", blob.path))?;
    }
    Ok(())
}

// ── Import / Export ───────────────────────────────────────────────────────────

/// Upload a local droplet and its metadata. The droplet goes first; a failed
/// metadata upload leaves it in place.
///
/// # Errors
///
/// Returns an error if either file cannot be opened or uploaded.
pub async fn import_droplet(
    store: &impl BlobStore,
    droplet_name: &str,
    droplet_file: &Path,
    metadata_file: &Path,
) -> Result<()> {
    validate_droplet_name(droplet_name)?;

    let droplet = tokio::fs::File::open(droplet_file)
        .await
        .with_context(|| format!("opening {}", droplet_file.display()))?;
    let metadata = tokio::fs::File::open(metadata_file)
        .await
        .with_context(|| format!("opening {}", metadata_file.display()))?;

    let path = droplet_path(droplet_name);
    store
        .upload(&path, droplet)
        .await
        .with_context(|| format!("uploading {path}"))?;
    let path = result_path(droplet_name);
    store
        .upload(&path, metadata)
        .await
        .with_context(|| format!("uploading {path}"))
}

/// Open the droplet archive for reading.
///
/// # Errors
///
/// Returns [`DropletError::Unavailable`] wrapping the store's error.
pub async fn export_droplet(store: &impl BlobStore, droplet_name: &str) -> Result<BlobReader> {
    open_for_export(store, &droplet_path(droplet_name)).await
}

/// Open the droplet's staging metadata for reading.
///
/// # Errors
///
/// Returns [`DropletError::Unavailable`] wrapping the store's error.
pub async fn export_metadata(store: &impl BlobStore, droplet_name: &str) -> Result<BlobReader> {
    open_for_export(store, &result_path(droplet_name)).await
}

async fn open_for_export(store: &impl BlobStore, path: &str) -> Result<BlobReader> {
    store.download(path).await.map_err(|e| {
        DropletError::Unavailable {
            cause: format!("{e:#}"),
        }
        .into()
    })
}

async fn read_blob(store: &impl BlobStore, path: &str) -> Result<Vec<u8>> {
    let mut reader = store.download(path).await?;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}
