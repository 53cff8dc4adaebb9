//! Command-line contract of the `s3tool` cluster helper.
//!
//! The executor has no S3-signing primitive, so S3 transfers on cluster nodes
//! run the helper with credentials as plain positional arguments:
//!
//! ```text
//! s3tool get    <access-key> <secret-key> <bucket> <region> <remote-path> <local-path>
//! s3tool put    <access-key> <secret-key> <bucket> <region> <remote-path> <local-path>
//! s3tool delete <access-key> <secret-key> <bucket> <region> <remote-path>
//! ```

use std::fmt;

use thiserror::Error;

/// Where the helper is unpacked on execution nodes.
pub const S3TOOL_PATH: &str = "/tmp/s3tool";

/// Static S3 credentials and bucket coordinates passed to the helper.
#[derive(Clone, PartialEq, Eq)]
pub struct S3ToolCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

impl fmt::Debug for S3ToolCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3ToolCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

/// A single helper invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S3ToolCommand {
    Get { remote_path: String, local_path: String },
    Put { remote_path: String, local_path: String },
    Delete { remote_path: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Usage: s3tool [get|put|delete] arguments...")]
    UnknownAction,

    #[error("Usage: s3tool get s3AccessKey s3SecretKey s3Bucket s3Region s3Path destinationFilePath")]
    Get,

    #[error("Usage: s3tool put s3AccessKey s3SecretKey s3Bucket s3Region s3Path fileToUpload")]
    Put,

    #[error("Usage: s3tool delete s3AccessKey s3SecretKey s3Bucket s3Region s3Path")]
    Delete,
}

impl S3ToolCommand {
    /// Render the full argument list (without the program name).
    #[must_use]
    pub fn to_args(&self, creds: &S3ToolCredentials) -> Vec<String> {
        let (verb, remote, local) = match self {
            Self::Get {
                remote_path,
                local_path,
            } => ("get", remote_path, Some(local_path)),
            Self::Put {
                remote_path,
                local_path,
            } => ("put", remote_path, Some(local_path)),
            Self::Delete { remote_path } => ("delete", remote_path, None),
        };

        let mut args = vec![
            verb.to_string(),
            creds.access_key.clone(),
            creds.secret_key.clone(),
            creds.bucket.clone(),
            creds.region.clone(),
            remote.clone(),
        ];
        args.extend(local.cloned());
        args
    }

    /// Parse an argument list (without the program name).
    pub fn parse(args: &[String]) -> Result<(Self, S3ToolCredentials), UsageError> {
        let Some((verb, rest)) = args.split_first() else {
            return Err(UsageError::UnknownAction);
        };

        let creds = |rest: &[String]| S3ToolCredentials {
            access_key: rest[0].clone(),
            secret_key: rest[1].clone(),
            bucket: rest[2].clone(),
            region: rest[3].clone(),
        };

        match verb.as_str() {
            "get" if rest.len() == 6 => Ok((
                Self::Get {
                    remote_path: rest[4].clone(),
                    local_path: rest[5].clone(),
                },
                creds(rest),
            )),
            "get" => Err(UsageError::Get),
            "put" if rest.len() == 6 => Ok((
                Self::Put {
                    remote_path: rest[4].clone(),
                    local_path: rest[5].clone(),
                },
                creds(rest),
            )),
            "put" => Err(UsageError::Put),
            "delete" if rest.len() == 5 => Ok((
                Self::Delete {
                    remote_path: rest[4].clone(),
                },
                creds(rest),
            )),
            "delete" => Err(UsageError::Delete),
            _ => Err(UsageError::UnknownAction),
        }
    }
}
