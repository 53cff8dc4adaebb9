//! Remote action vocabulary understood by the cluster executor.
//!
//! Actions serialize in the executor's externally tagged JSON shape, e.g.
//! `{"download": {"from": "...", "to": "/tmp", "user": "vcap"}}`. The
//! executor runs the actions of a `Serial` action in the literal order given.

use serde::{Deserialize, Serialize};

/// The unprivileged user every droplet action runs as.
pub const DEFAULT_USER: &str = "vcap";

/// A single instruction executed on a cluster node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Fetch a URL into a directory, extracting archives.
    Download(DownloadAction),
    /// Store a local file at a URL.
    Upload(UploadAction),
    /// Run a process.
    Run(RunAction),
    /// Run child actions one after another, stopping at the first failure.
    Serial(SerialAction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadAction {
    pub from: String,
    pub to: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAction {
    pub from: String,
    pub to: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAction {
    pub path: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialAction {
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_source: Option<String>,
}

impl Action {
    /// Download `from` into `to` as the default user.
    #[must_use]
    pub fn download(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Download(DownloadAction {
            from: from.into(),
            to: to.into(),
            user: DEFAULT_USER.to_string(),
            log_source: None,
        })
    }

    /// Upload the local file `from` to the URL `to` as the default user.
    #[must_use]
    pub fn upload(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Upload(UploadAction {
            from: from.into(),
            to: to.into(),
            user: DEFAULT_USER.to_string(),
            log_source: None,
        })
    }

    /// Run `path` with `args` as the default user, without a working directory.
    #[must_use]
    pub fn run<I, S>(path: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Run(RunAction {
            path: path.into(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            user: DEFAULT_USER.to_string(),
            log_source: None,
        })
    }

    /// Serial composition of `actions`.
    #[must_use]
    pub fn serial(actions: Vec<Action>) -> Self {
        Self::Serial(SerialAction {
            actions,
            log_source: None,
        })
    }

    /// Set the working directory. Only meaningful for `Run`; other variants
    /// are returned unchanged.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<String>) -> Self {
        if let Self::Run(run) = &mut self {
            run.dir = Some(dir.into());
        }
        self
    }

    /// Run as `user` instead of [`DEFAULT_USER`]. `Serial` has no user and is
    /// returned unchanged.
    #[must_use]
    pub fn as_user(mut self, user: impl Into<String>) -> Self {
        let user = user.into();
        match &mut self {
            Self::Download(a) => a.user = user,
            Self::Upload(a) => a.user = user,
            Self::Run(a) => a.user = user,
            Self::Serial(_) => {}
        }
        self
    }

    /// Tag the action's log lines with `source`.
    #[must_use]
    pub fn with_log_source(mut self, source: impl Into<String>) -> Self {
        let source = Some(source.into());
        match &mut self {
            Self::Download(a) => a.log_source = source,
            Self::Upload(a) => a.log_source = source,
            Self::Run(a) => a.log_source = source,
            Self::Serial(a) => a.log_source = source,
        }
        self
    }
}
