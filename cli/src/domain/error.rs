//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator; callers recover them with `downcast_ref`.

use thiserror::Error;

// ── Droplet errors ────────────────────────────────────────────────────────────

/// Errors in the droplet lifecycle, distinct from transport failures.
#[derive(Debug, Error)]
pub enum DropletError {
    #[error("droplet not found")]
    NotFound,

    /// The droplet blob could not be opened; `cause` is the store's error.
    #[error("droplet not found: {cause}")]
    Unavailable { cause: String },

    #[error("app {app} was launched from droplet")]
    InUse { app: String },

    #[error("invalid droplet name '{0}': use letters, digits, '.', '_' or '-'")]
    InvalidName(String),

    #[error("invalid staging result")]
    InvalidStagingResult(#[source] serde_json::Error),

    #[error("droplet has no execution metadata; provide a start command")]
    MissingExecutionMetadata,

    #[error("invalid execution metadata")]
    InvalidExecutionMetadata(#[source] serde_json::Error),
}

// ── Blob store errors ─────────────────────────────────────────────────────────

/// Errors raised by blob store backends outside of the SDK's own error types.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("{method} {path}: unexpected status {status}")]
    UnexpectedStatus {
        method: String,
        path: String,
        status: u16,
    },

    #[error("No droplet store specified. Run 'droplet target' first.")]
    NotConfigured,

    #[error("malformed directory listing: {0}")]
    MalformedListing(String),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration and command input validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid buildpack {0}")]
    UnknownBuildpack(String),

    #[error("invalid port {0}: must be between 1 and 65535")]
    InvalidPort(String),

    #[error("invalid CPU weight {0}: must be between 1 and 100")]
    InvalidCpuWeight(u32),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid environment variable '{0}': expected KEY=VALUE")]
    InvalidEnvVar(String),

    #[error("invalid route '{0}': expected <host>:<container-port>")]
    InvalidRoute(String),

    #[error("invalid monitor '{0}'")]
    InvalidMonitor(String),

    #[error("Target not set. Run 'droplet target <domain>' first.")]
    NoTarget,
}
