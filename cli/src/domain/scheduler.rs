//! Request and status types exchanged with the cluster scheduler.
//!
//! The scheduler is a black box: these types describe what the CLI submits
//! and the little it reads back.

use std::collections::BTreeMap;

use anyhow::Result;
use droplet_common::Action;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Domain all droplet tasks and apps are registered under.
pub const DOMAIN: &str = "lattice";
/// Root filesystem buildpack droplets are built and run on.
pub const DROPLET_ROOTFS: &str = "preloaded:cflinuxfs2";
/// Stack name exported to the buildpack lifecycle.
pub const DROPLET_STACK: &str = "cflinuxfs2";

/// A single `NAME=value` pair, in the scheduler's list form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

impl EnvironmentVariable {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

/// A one-shot task submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRequest {
    pub task_guid: String,
    pub log_guid: String,
    pub metrics_guid: String,
    pub domain: String,
    pub rootfs: String,
    #[serde(rename = "env")]
    pub environment: Vec<EnvironmentVariable>,
    pub cpu_weight: u32,
    pub memory_mb: u32,
    pub disk_mb: u32,
    pub log_source: String,
    pub privileged: bool,
    pub egress_rules: Vec<serde_json::Value>,
    pub action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Claimed,
    Running,
    Completed,
    Resolving,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    /// Whether the task may still change state on its own.
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Pending | Self::Claimed | Self::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskInfo {
    pub task_guid: String,
    pub state: TaskState,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub failure_reason: String,
}

// ── Apps ──────────────────────────────────────────────────────────────────────

/// How an app instance is health-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorConfig {
    None,
    Port(u16),
    Url { port: u16, endpoint: String },
}

/// An HTTP route: requests for `hostname` on port 80 go to container `port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpRoute {
    pub hostname: String,
    pub port: u16,
}

/// Resource, routing and environment settings for a long-running app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEnvironmentParams {
    pub environment: BTreeMap<String, String>,
    pub privileged: bool,
    pub user: String,
    pub instances: u32,
    pub cpu_weight: u32,
    pub memory_mb: u32,
    pub disk_mb: u32,
    pub exposed_ports: Vec<u16>,
    pub monitor: MonitorConfig,
    pub routes: Vec<HttpRoute>,
}

impl Default for AppEnvironmentParams {
    fn default() -> Self {
        Self {
            environment: BTreeMap::new(),
            privileged: false,
            user: droplet_common::DEFAULT_USER.to_string(),
            instances: 1,
            cpu_weight: 100,
            memory_mb: 256,
            disk_mb: 0,
            exposed_ports: vec![8080],
            monitor: MonitorConfig::Port(8080),
            routes: Vec::new(),
        }
    }
}

/// A long-running app submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCreateRequest {
    pub name: String,
    pub rootfs: String,
    pub start_command: String,
    pub app_args: Vec<String>,
    pub working_dir: String,
    pub annotation: String,
    pub setup: Action,
    pub params: AppEnvironmentParams,
}

/// What the app inspector reports for each running app.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppInfo {
    pub process_guid: String,
    #[serde(default)]
    pub annotation: String,
}

// ── Input parsing ─────────────────────────────────────────────────────────────

/// Parse `-e` values. `KEY=VALUE` sets a value; a bare `KEY` copies the
/// value from `lookup` (empty when unset).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for entries with an empty key.
pub fn parse_environment(
    entries: &[String],
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for entry in entries {
        let (key, value) = match entry.split_once('=') {
            Some((key, value)) => (key, value.to_string()),
            None => (entry.as_str(), lookup(entry).unwrap_or_default()),
        };
        if key.is_empty() {
            return Err(ConfigError::InvalidEnvVar(entry.clone()).into());
        }
        env.insert(key.to_string(), value);
    }
    Ok(env)
}

/// Parse a comma separated port list. An empty list yields the default 8080.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPort`] for non-numeric or zero ports.
pub fn parse_ports(ports: &str) -> Result<Vec<u16>> {
    if ports.trim().is_empty() {
        return Ok(vec![8080]);
    }
    let mut parsed = ports
        .split(',')
        .map(|p| match p.trim().parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(anyhow::Error::from(ConfigError::InvalidPort(p.to_string()))),
        })
        .collect::<Result<Vec<u16>>>()?;
    parsed.sort_unstable();
    parsed.dedup();
    Ok(parsed)
}

/// Validate a relative CPU weight.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidCpuWeight`] outside `1..=100`.
pub fn validate_cpu_weight(weight: u32) -> Result<()> {
    if !(1..=100).contains(&weight) {
        return Err(ConfigError::InvalidCpuWeight(weight).into());
    }
    Ok(())
}

/// Default routes for an app: `<app>.<domain>` and `<app>-<port>.<domain>`
/// for the first exposed port.
#[must_use]
pub fn default_routes(app_name: &str, target: &str, ports: &[u16]) -> Vec<HttpRoute> {
    let Some(&port) = ports.first() else {
        return Vec::new();
    };
    vec![
        HttpRoute {
            hostname: format!("{app_name}.{target}"),
            port,
        },
        HttpRoute {
            hostname: format!("{app_name}-{port}.{target}"),
            port,
        },
    ]
}

/// Parse `--http-route host:port` entries into routes under `target`.
/// Every port must be exposed.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidRoute`] for a malformed entry or an
/// unexposed port.
pub fn parse_http_routes(entries: &[String], target: &str, exposed: &[u16]) -> Result<Vec<HttpRoute>> {
    entries
        .iter()
        .map(|entry| {
            let invalid = || anyhow::Error::from(ConfigError::InvalidRoute(entry.clone()));
            let (host, port) = entry.rsplit_once(':').ok_or_else(invalid)?;
            let port: u16 = port.parse().map_err(|_| invalid())?;
            if host.is_empty() || !exposed.contains(&port) {
                return Err(invalid());
            }
            Ok(HttpRoute {
                hostname: format!("{host}.{target}"),
                port,
            })
        })
        .collect()
}

/// Pick the health check. An explicit URL (`port:/path`) wins over an
/// explicit port; without either, the first exposed port is checked.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidMonitor`] for a malformed URL or a port
/// that is not exposed.
pub fn monitor_config(
    exposed: &[u16],
    port: Option<u16>,
    url: Option<&str>,
    disabled: bool,
) -> Result<MonitorConfig> {
    if disabled {
        return Ok(MonitorConfig::None);
    }
    let ensure_exposed = |port: u16, raw: String| {
        if exposed.contains(&port) {
            Ok(port)
        } else {
            Err(anyhow::Error::from(ConfigError::InvalidMonitor(raw)))
        }
    };
    if let Some(url) = url {
        let invalid = || anyhow::Error::from(ConfigError::InvalidMonitor(url.to_string()));
        let (port, endpoint) = url.split_once(':').ok_or_else(invalid)?;
        let port = port.parse().map_err(|_| invalid())?;
        return Ok(MonitorConfig::Url {
            port: ensure_exposed(port, url.to_string())?,
            endpoint: endpoint.to_string(),
        });
    }
    if let Some(port) = port {
        return Ok(MonitorConfig::Port(ensure_exposed(port, port.to_string())?));
    }
    Ok(exposed
        .first()
        .map_or(MonitorConfig::None, |&port| MonitorConfig::Port(port)))
}
