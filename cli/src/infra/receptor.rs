//! HTTP client for the cluster scheduler's receptor API.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use droplet_common::Action;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::application::ports::{AppExaminer, AppRunner, TaskExaminer, TaskRunner};
use crate::domain::scheduler::{DOMAIN, EnvironmentVariable, MonitorConfig};
use crate::domain::{AppCreateRequest, AppInfo, TaskInfo, TaskRequest};

const HEALTHCHECK_PATH: &str = "/tmp/healthcheck";
const APP_LOG_SOURCE: &str = "APP";
const HEALTH_LOG_SOURCE: &str = "HEALTH";
const ROUTER_KEY: &str = "cf-router";

/// Non-2xx response from the receptor.
#[derive(Debug, thiserror::Error)]
#[error("receptor {method} {path} returned {status}: {message}")]
pub struct ReceptorError {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Scheduler client speaking the receptor's JSON API.
pub struct ReceptorClient {
    client: reqwest::Client,
    base: Url,
    credentials: Option<(String, String)>,
}

impl ReceptorClient {
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid receptor URL {base_url}"))?;
        let credentials =
            (!username.is_empty()).then(|| (username.to_string(), password.to_string()));
        Ok(Self {
            client: reqwest::Client::new(),
            base,
            credentials,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base.join(path)?;
        tracing::debug!(%method, %path, "receptor request");
        let builder = self.client.request(method, url);
        Ok(match &self.credentials {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        })
    }

    async fn send(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("connecting to receptor at {}", self.base))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_default();
        Err(ReceptorError {
            method: method.to_string(),
            path: path.to_string(),
            status: status.as_u16(),
            message,
        }
        .into())
    }
}

impl TaskRunner for ReceptorClient {
    async fn submit_task(&self, request: &TaskRequest) -> Result<()> {
        let path = "/v1/tasks";
        let builder = self.request(Method::POST, path)?.json(request);
        self.send(Method::POST, path, builder).await?;
        Ok(())
    }
}

impl TaskExaminer for ReceptorClient {
    async fn task_status(&self, task_guid: &str) -> Result<TaskInfo> {
        let path = format!("/v1/tasks/{task_guid}");
        let builder = self.request(Method::GET, &path)?;
        let response = self.send(Method::GET, &path, builder).await?;
        response
            .json()
            .await
            .with_context(|| format!("decoding task {task_guid}"))
    }
}

impl AppRunner for ReceptorClient {
    async fn create_app(&self, request: &AppCreateRequest) -> Result<()> {
        let path = "/v1/desired_lrps";
        let body = DesiredLrpCreateRequest::from_app(request);
        let builder = self.request(Method::POST, path)?.json(&body);
        self.send(Method::POST, path, builder).await?;
        Ok(())
    }
}

impl AppExaminer for ReceptorClient {
    async fn list_apps(&self) -> Result<Vec<AppInfo>> {
        let path = "/v1/desired_lrps";
        let builder = self.request(Method::GET, path)?;
        let response = self.send(Method::GET, path, builder).await?;
        response.json().await.context("decoding desired LRPs")
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, PartialEq, Eq)]
struct RouterEntry {
    hostnames: Vec<String>,
    port: u16,
}

#[derive(Debug, Serialize)]
struct DesiredLrpCreateRequest<'a> {
    process_guid: &'a str,
    domain: &'static str,
    rootfs: &'a str,
    instances: u32,
    env: Vec<EnvironmentVariable>,
    cpu_weight: u32,
    memory_mb: u32,
    disk_mb: u32,
    privileged: bool,
    ports: &'a [u16],
    routes: BTreeMap<&'static str, Vec<RouterEntry>>,
    log_guid: &'a str,
    log_source: &'static str,
    metrics_guid: &'a str,
    setup: &'a Action,
    action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    monitor: Option<Action>,
    annotation: &'a str,
    egress_rules: Vec<serde_json::Value>,
}

impl<'a> DesiredLrpCreateRequest<'a> {
    fn from_app(app: &'a AppCreateRequest) -> Self {
        let params = &app.params;

        let mut env: Vec<_> = params
            .environment
            .iter()
            .map(|(k, v)| EnvironmentVariable::new(k, v))
            .collect();
        if let Some(port) = params.exposed_ports.first()
            && !params.environment.contains_key("PORT")
        {
            env.push(EnvironmentVariable::new("PORT", port.to_string()));
        }

        let mut by_port: BTreeMap<u16, Vec<String>> = BTreeMap::new();
        for route in &params.routes {
            by_port.entry(route.port).or_default().push(route.hostname.clone());
        }
        let router: Vec<_> = by_port
            .into_iter()
            .map(|(port, hostnames)| RouterEntry { hostnames, port })
            .collect();
        let mut routes = BTreeMap::new();
        routes.insert(ROUTER_KEY, router);

        let monitor = match &params.monitor {
            MonitorConfig::None => None,
            MonitorConfig::Port(port) => Some(vec![format!("-port={port}")]),
            MonitorConfig::Url { port, endpoint } => {
                Some(vec![format!("-port={port}"), format!("-uri={endpoint}")])
            }
        }
        .map(|args| {
            Action::run(HEALTHCHECK_PATH, args)
                .as_user(&params.user)
                .with_log_source(HEALTH_LOG_SOURCE)
        });

        Self {
            process_guid: &app.name,
            domain: DOMAIN,
            rootfs: &app.rootfs,
            instances: params.instances,
            env,
            cpu_weight: params.cpu_weight,
            memory_mb: params.memory_mb,
            disk_mb: params.disk_mb,
            privileged: params.privileged,
            ports: &params.exposed_ports,
            routes,
            log_guid: &app.name,
            log_source: APP_LOG_SOURCE,
            metrics_guid: &app.name,
            setup: &app.setup,
            action: Action::run(&app.start_command, app.app_args.iter().cloned())
                .in_dir(&app.working_dir)
                .as_user(&params.user),
            monitor,
            annotation: &app.annotation,
            egress_rules: Vec::new(),
        }
    }
}
