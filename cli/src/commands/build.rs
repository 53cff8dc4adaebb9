//! `droplet build-droplet <name> <buildpack>`: stage app bits into a
//! droplet on the cluster.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::droplet_runner::{BuildRequest, build_droplet};
use crate::application::services::poll::{BuildOutcome, wait_for_build};
use crate::commands::ensure_blob_store_verified;
use crate::domain::BuildpackCatalog;
use crate::domain::scheduler::{parse_environment, validate_cpu_weight};
use crate::infra::clock::SystemClock;
use crate::infra::zipper::ZipArchiver;
use crate::output::{TerminalReporter, progress};

/// Arguments for the build-droplet command.
#[derive(Args)]
pub struct BuildArgs {
    /// Name of the droplet to build
    pub droplet_name: String,

    /// Buildpack name (go, java, python, ruby, nodejs, php, binary, staticfile) or URL
    pub buildpack: String,

    /// Path to the app source: a directory or a zip archive
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Relative CPU weight for the container (valid values: 1-100)
    #[arg(short, long, default_value_t = 100)]
    pub cpu_weight: u32,

    /// Memory limit for container in MB
    #[arg(short, long, default_value_t = 512)]
    pub memory_mb: u32,

    /// Disk limit for container in MB
    #[arg(short, long, default_value_t = 0)]
    pub disk_mb: u32,

    /// Environment variable as KEY=VALUE, or KEY to copy it from this shell (repeatable)
    #[arg(short, long = "env")]
    pub env: Vec<String>,

    /// How long to wait for the build, e.g. 90s, 5m
    #[arg(short, long, default_value = "2m", value_parser = parse_duration)]
    pub timeout: Duration,
}

/// Parse `<n>`, `<n>s`, `<n>m` or `<n>h`. A bare number is seconds.
///
/// # Errors
///
/// Returns an error for anything else.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (digits, scale) = match raw.char_indices().last() {
        Some((i, 's')) => (&raw[..i], 1),
        Some((i, 'm')) => (&raw[..i], 60),
        Some((i, 'h')) => (&raw[..i], 3600),
        _ => (raw, 1),
    };
    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(scale))
        .map(Duration::from_secs)
        .ok_or_else(|| format!("invalid duration '{raw}': use e.g. 90s, 5m or 1h"))
}

/// Run `droplet build-droplet`.
///
/// # Errors
///
/// Returns an error if input is invalid, the store cannot be verified,
/// submission fails, or the build reports failure. A build still running at
/// the timeout is not an error.
pub async fn run(app: &AppContext, args: BuildArgs) -> Result<()> {
    let config = app.load_config()?;
    let catalog = BuildpackCatalog::new(&config.buildpacks);
    let buildpack_url = match catalog.resolve(&args.buildpack) {
        Ok(url) => url,
        Err(e) => {
            app.output.line("Available buildpacks:");
            for (name, url) in catalog.iter() {
                app.output.kv(name, url);
            }
            return Err(e);
        }
    };
    validate_cpu_weight(args.cpu_weight)?;
    let environment = parse_environment(&args.env, |key| std::env::var(key).ok())?;

    ensure_blob_store_verified(&app.verifier(), &config).await?;
    let store = app.blob_store(&config).await?;
    let receptor = app.receptor(&config)?;
    let proxy = app.proxy_conf_reader(&config)?;
    let reporter = TerminalReporter::new(&app.output);

    let name = &args.droplet_name;
    let task_name = format!("build-droplet-{name}");
    let request = BuildRequest {
        task_name: &task_name,
        droplet_name: name,
        buildpack_url: &buildpack_url,
        source: &args.path,
        environment: &environment,
        memory_mb: args.memory_mb,
        cpu_weight: args.cpu_weight,
        disk_mb: args.disk_mb,
    };
    build_droplet(&store, &ZipArchiver, &proxy, &receptor, &reporter, &request)
        .await
        .with_context(|| format!("building {name}"))?;
    app.output.success(&format!("Submitted build of {name}"));

    let spinner = progress::spinner(&app.output, "Waiting for the build to complete...");
    let outcome = wait_for_build(&receptor, &SystemClock, &task_name, args.timeout).await;
    progress::finish(&spinner);

    match outcome.context("requesting task status")? {
        BuildOutcome::Completed => app.output.success("Build completed"),
        BuildOutcome::Failed(reason) => bail!("Build failed: {reason}"),
        BuildOutcome::TimedOut => {
            app.output.warn("Timed out waiting for the build to complete.");
            app.output
                .line("Lattice is still building your application in the background.");
            app.output.line(&format!(
                "Run 'droplet list-droplets' later; the task is {task_name}."
            ));
        }
    }
    Ok(())
}
