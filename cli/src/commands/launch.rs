//! `droplet launch-droplet <app> <droplet> [-- cmd args...]`: run a droplet
//! as a long-running app.

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::droplet_runner::{LaunchRequest, launch_droplet};
use crate::domain::AppEnvironmentParams;
use crate::domain::scheduler::{
    default_routes, monitor_config, parse_environment, parse_http_routes, parse_ports,
    validate_cpu_weight,
};

/// Arguments for the launch-droplet command.
#[derive(Args)]
pub struct LaunchArgs {
    /// Name of the app to create
    pub app_name: String,

    /// Droplet to run
    pub droplet_name: String,

    /// Environment variable as KEY=VALUE, or KEY to copy it from this shell (repeatable)
    #[arg(short, long = "env")]
    pub env: Vec<String>,

    /// Relative CPU weight for the container (valid values: 1-100)
    #[arg(short, long, default_value_t = 100)]
    pub cpu_weight: u32,

    /// Memory limit for container in MB
    #[arg(short, long, default_value_t = 256)]
    pub memory_mb: u32,

    /// Disk limit for container in MB
    #[arg(short, long, default_value_t = 0)]
    pub disk_mb: u32,

    /// Ports to expose on the container (comma delimited)
    #[arg(short, long, default_value = "")]
    pub ports: String,

    /// Port used to healthcheck the app
    #[arg(short = 'M', long)]
    pub monitor_port: Option<u16>,

    /// HTTP healthcheck as <port>:<endpoint-path>
    #[arg(short = 'U', long)]
    pub monitor_url: Option<String>,

    /// Route <host>.<domain> to a container port, as <host>:<container-port> (repeatable)
    #[arg(short = 'R', long = "http-route")]
    pub http_routes: Vec<String>,

    /// Number of application instances to spawn on launch
    #[arg(short, long, default_value_t = 1)]
    pub instances: u32,

    /// Disable healthchecking for the app
    #[arg(long)]
    pub no_monitor: bool,

    /// Register no routes for the app
    #[arg(long)]
    pub no_routes: bool,

    /// Start command and its arguments, overriding the buildpack's
    #[arg(last = true)]
    pub start: Vec<String>,
}

/// Run `droplet launch-droplet`.
///
/// # Errors
///
/// Returns an error if input is invalid, the droplet's metadata cannot be
/// read, or the app cannot be created.
pub async fn run(app: &AppContext, args: LaunchArgs) -> Result<()> {
    let config = app.load_config()?;
    let target = config.require_target()?.to_string();
    validate_cpu_weight(args.cpu_weight)?;

    if args.ports.trim().is_empty() {
        app.output.notice("No port specified. Defaulting to 8080.");
    }
    let exposed_ports = parse_ports(&args.ports)?;
    let monitor = monitor_config(
        &exposed_ports,
        args.monitor_port,
        args.monitor_url.as_deref(),
        args.no_monitor,
    )?;
    let routes = if args.no_routes {
        Vec::new()
    } else if args.http_routes.is_empty() {
        default_routes(&args.app_name, &target, &exposed_ports)
    } else {
        parse_http_routes(&args.http_routes, &target, &exposed_ports)?
    };

    let mut environment = parse_environment(&args.env, |key| std::env::var(key).ok())?;
    environment.insert("MEMORY_LIMIT".to_string(), format!("{}M", args.memory_mb));

    let params = AppEnvironmentParams {
        environment,
        instances: args.instances,
        cpu_weight: args.cpu_weight,
        memory_mb: args.memory_mb,
        disk_mb: args.disk_mb,
        exposed_ports,
        monitor,
        routes,
        ..AppEnvironmentParams::default()
    };

    let (start_command, start_args) = match args.start.split_first() {
        Some((command, rest)) => (command.as_str(), rest),
        None => ("", &[][..]),
    };

    let store = app.blob_store(&config).await?;
    let receptor = app.receptor(&config)?;
    let proxy = app.proxy_conf_reader(&config)?;
    let request = LaunchRequest {
        app_name: &args.app_name,
        droplet_name: &args.droplet_name,
        start_command,
        start_args,
    };
    let routes = params.routes.clone();
    launch_droplet(&store, &proxy, &receptor, &request, params)
        .await
        .with_context(|| {
            format!(
                "launching app {} from droplet {}",
                args.app_name, args.droplet_name
            )
        })?;

    app.output.success(&format!(
        "App {} launched from droplet {}",
        args.app_name, args.droplet_name
    ));
    for route in routes {
        app.output.kv("Route:", &format!("http://{}", route.hostname));
    }
    Ok(())
}
