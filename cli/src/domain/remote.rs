//! Remote actions produced by blob store backends.
//!
//! Backends without a native transfer primitive for their store hand the
//! cluster a helper invocation with credentials in its argument list. Such
//! actions are tagged [`RemoteAction::CredentialedArgv`] so call sites can
//! tell them apart and avoid logging them.

use droplet_common::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAction {
    /// Carries no secrets outside of what the executor itself protects.
    Direct(Action),
    /// Embeds store credentials in plain text inside the action.
    CredentialedArgv(Action),
}

impl RemoteAction {
    #[must_use]
    pub fn exposes_credentials(&self) -> bool {
        matches!(self, Self::CredentialedArgv(_))
    }

    /// Unwrap into the action submitted to the scheduler.
    #[must_use]
    pub fn into_action(self) -> Action {
        match self {
            Self::Direct(action) | Self::CredentialedArgv(action) => action,
        }
    }

    /// A loggable summary. URLs are left out since DAV URLs carry userinfo.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Direct(action) => summarize(action),
            Self::CredentialedArgv(_) => "credentialed action".to_string(),
        }
    }
}

fn summarize(action: &Action) -> String {
    match action {
        Action::Download(a) => format!("download to {}", a.to),
        Action::Upload(a) => format!("upload from {}", a.from),
        Action::Run(a) => format!("run {}", a.path),
        Action::Serial(a) => format!("serial of {} actions", a.actions.len()),
    }
}
