//! Staging result (`result.json`) parsing and launch argument derivation.

use anyhow::Result;
use serde::Deserialize;

use crate::domain::error::DropletError;

/// In-container launcher unpacked from the cell-helpers bundle.
pub const LAUNCHER_PATH: &str = "/tmp/launcher";
/// Where the droplet's `app/` tree lands once extracted into the home dir.
pub const APP_DIR: &str = "/home/vcap/app";

/// The subset of `result.json` the CLI consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StagingResult {
    /// Buildpack-produced JSON, kept as the exact string the buildpack wrote.
    #[serde(default)]
    pub execution_metadata: String,
}

#[derive(Debug, Deserialize)]
struct ExecutionMetadata {
    #[serde(default)]
    start_command: Option<String>,
}

impl StagingResult {
    /// Parse the raw contents of `result.json`.
    ///
    /// # Errors
    ///
    /// Returns [`DropletError::InvalidStagingResult`] when the document is not
    /// valid JSON.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw)
            .map_err(|e| DropletError::InvalidStagingResult(e).into())
    }

    /// `start_command` from the nested execution metadata, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DropletError::InvalidExecutionMetadata`] when the nested
    /// document is present but not valid JSON.
    pub fn start_command(&self) -> Result<Option<String>> {
        if self.execution_metadata.trim().is_empty() {
            return Ok(None);
        }
        let metadata: ExecutionMetadata = serde_json::from_str(&self.execution_metadata)
            .map_err(DropletError::InvalidExecutionMetadata)?;
        Ok(metadata.start_command.filter(|c| !c.is_empty()))
    }
}

/// The process an app runs: always the launcher, which receives the app dir,
/// the caller's command line (possibly empty) and the raw execution metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub path: String,
    pub args: Vec<String>,
}

/// Derive the launcher invocation for a droplet.
///
/// A non-empty `start_command` takes precedence inside the launcher. Without
/// one, the buildpack metadata must name a start command.
///
/// # Errors
///
/// Returns [`DropletError::MissingExecutionMetadata`] when neither the caller
/// nor the metadata supplies a start command, or
/// [`DropletError::InvalidExecutionMetadata`] when the metadata is malformed.
pub fn launch_command(
    staging: &StagingResult,
    start_command: &str,
    start_args: &[String],
) -> Result<LaunchCommand> {
    let command_line = if start_command.is_empty() {
        if staging.start_command()?.is_none() {
            return Err(DropletError::MissingExecutionMetadata.into());
        }
        String::new()
    } else {
        std::iter::once(start_command)
            .chain(start_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    };

    Ok(LaunchCommand {
        path: LAUNCHER_PATH.to_string(),
        args: vec![
            APP_DIR.to_string(),
            command_line,
            staging.execution_metadata.clone(),
        ],
    })
}
