//! Shared in-memory collaborators for unit tests.
//!
//! Each fake records what it was asked to do so tests can assert on the
//! calls a service made, not only on its return value.

#![allow(clippy::expect_used, dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use droplet_common::Action;
use tokio::io::AsyncReadExt as _;

use droplet_cli::application::ports::{
    AppExaminer, AppRunner, BlobReader, BlobStore, Clock, ProgressReporter, ProxyConfReader,
    TaskExaminer, TaskRunner,
};
use droplet_cli::domain::droplet::DropletAnnotation;
use droplet_cli::domain::scheduler::TaskState;
use droplet_cli::domain::{
    AppCreateRequest, AppInfo, Blob, ProxyConf, RemoteAction, TaskInfo, TaskRequest,
};

// ── Blob store ───────────────────────────────────────────────────────────────

/// Blob store holding contents in memory and recording every mutation.
#[derive(Default)]
pub struct MemoryBlobStore {
    pub contents: Mutex<BTreeMap<String, Vec<u8>>>,
    pub uploads: Mutex<Vec<String>>,
    pub deletes: Mutex<Vec<String>>,
    /// Deleting this path fails.
    pub fail_delete: Option<String>,
}

impl MemoryBlobStore {
    pub fn with_blobs(paths: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut contents = store.contents.lock().expect("lock");
            for (path, bytes) in paths {
                contents.insert((*path).to_string(), bytes.as_bytes().to_vec());
            }
        }
        store
    }

    pub fn paths(&self) -> Vec<String> {
        self.contents.lock().expect("lock").keys().cloned().collect()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.contents.lock().expect("lock").get(path).cloned()
    }

    fn fake(kind: &str, name: &str) -> RemoteAction {
        RemoteAction::Direct(Action::run("/fake/action", [kind, name]))
    }
}

impl BlobStore for MemoryBlobStore {
    async fn list(&self) -> Result<Vec<Blob>> {
        Ok(self
            .contents
            .lock()
            .expect("lock")
            .iter()
            .map(|(path, bytes)| Blob {
                path: path.clone(),
                size: bytes.len() as u64,
                created: None,
            })
            .collect())
    }

    async fn upload(&self, path: &str, mut file: tokio::fs::File) -> Result<()> {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).await?;
        self.uploads.lock().expect("lock").push(path.to_string());
        self.contents
            .lock()
            .expect("lock")
            .insert(path.to_string(), bytes);
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<BlobReader> {
        match self.get(path) {
            Some(bytes) => Ok(Box::new(std::io::Cursor::new(bytes))),
            None => bail!("GET /blobs/{path}: unexpected status 404"),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if self.fail_delete.as_deref() == Some(path) {
            bail!("DELETE /blobs/{path}: unexpected status 500");
        }
        self.deletes.lock().expect("lock").push(path.to_string());
        self.contents.lock().expect("lock").remove(path);
        Ok(())
    }

    fn download_app_bits_action(&self, droplet_name: &str) -> RemoteAction {
        Self::fake("download-bits", droplet_name)
    }

    fn delete_app_bits_action(&self, droplet_name: &str) -> RemoteAction {
        Self::fake("delete-bits", droplet_name)
    }

    fn upload_droplet_action(&self, droplet_name: &str) -> RemoteAction {
        Self::fake("upload-droplet", droplet_name)
    }

    fn upload_droplet_metadata_action(&self, droplet_name: &str) -> RemoteAction {
        Self::fake("upload-metadata", droplet_name)
    }

    fn download_droplet_action(&self, droplet_name: &str) -> RemoteAction {
        Self::fake("download-droplet", droplet_name)
    }
}

// ── Scheduler ────────────────────────────────────────────────────────────────

/// Scheduler that records submissions and replays canned task states.
#[derive(Default)]
pub struct FakeScheduler {
    pub tasks: Mutex<Vec<TaskRequest>>,
    pub created: Mutex<Vec<AppCreateRequest>>,
    pub apps: Vec<AppInfo>,
    /// Consumed front to back; the last state repeats.
    pub statuses: Mutex<VecDeque<TaskInfo>>,
    pub status_calls: Mutex<usize>,
}

impl FakeScheduler {
    pub fn with_statuses(states: impl IntoIterator<Item = TaskInfo>) -> Self {
        Self {
            statuses: Mutex::new(states.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn with_app_from(app: &str, droplet_name: &str) -> Self {
        Self {
            apps: vec![AppInfo {
                process_guid: app.to_string(),
                annotation: DropletAnnotation::new(droplet_name)
                    .to_json()
                    .expect("annotation"),
            }],
            ..Self::default()
        }
    }
}

pub fn task(state: TaskState, failure_reason: &str) -> TaskInfo {
    TaskInfo {
        task_guid: "build-droplet-app".to_string(),
        state,
        failed: !failure_reason.is_empty(),
        failure_reason: failure_reason.to_string(),
    }
}

impl TaskRunner for FakeScheduler {
    async fn submit_task(&self, request: &TaskRequest) -> Result<()> {
        self.tasks.lock().expect("lock").push(request.clone());
        Ok(())
    }
}

impl TaskExaminer for FakeScheduler {
    async fn task_status(&self, _task_guid: &str) -> Result<TaskInfo> {
        *self.status_calls.lock().expect("lock") += 1;
        let mut statuses = self.statuses.lock().expect("lock");
        let info = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        match info {
            Some(info) => Ok(info),
            None => bail!("receptor GET /v1/tasks returned 404: task not found"),
        }
    }
}

impl AppRunner for FakeScheduler {
    async fn create_app(&self, request: &AppCreateRequest) -> Result<()> {
        self.created.lock().expect("lock").push(request.clone());
        Ok(())
    }
}

impl AppExaminer for FakeScheduler {
    async fn list_apps(&self) -> Result<Vec<AppInfo>> {
        Ok(self.apps.clone())
    }
}

// ── Collaborators ────────────────────────────────────────────────────────────

/// Proxy reader returning a fixed configuration, or failing when `None`.
pub struct FakeProxy(pub Option<ProxyConf>);

impl FakeProxy {
    pub fn with_http_proxy(url: &str) -> Self {
        Self(Some(ProxyConf {
            http_proxy: url.to_string(),
            ..ProxyConf::default()
        }))
    }
}

impl ProxyConfReader for FakeProxy {
    async fn proxy_conf(&self) -> Result<ProxyConf> {
        match &self.0 {
            Some(conf) => Ok(conf.clone()),
            None => bail!("fetching proxyconf.json returned 500 Internal Server Error"),
        }
    }
}

/// Clock whose sleeps advance time instantly.
pub struct FakeClock {
    now: Mutex<Instant>,
    pub sleeps: Mutex<Vec<Duration>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
            sleeps: Mutex::new(Vec::new()),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("lock")
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("lock").push(duration);
        *self.now.lock().expect("lock") += duration;
    }
}

/// Reporter that keeps messages instead of printing them.
#[derive(Default)]
pub struct RecordingReporter {
    pub messages: Mutex<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.messages.lock().expect("lock").push(message.to_string());
    }

    fn success(&self, message: &str) {
        self.messages.lock().expect("lock").push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.messages.lock().expect("lock").push(message.to_string());
    }
}
