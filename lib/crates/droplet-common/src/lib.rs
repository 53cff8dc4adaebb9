pub mod action;
pub mod paths;
pub mod s3tool;

pub use action::{Action, DEFAULT_USER, DownloadAction, RunAction, SerialAction, UploadAction};
pub use paths::{BITS_ZIP, DROPLET_TGZ, RESULT_JSON, bits_path, droplet_path, result_path};
pub use s3tool::{S3TOOL_PATH, S3ToolCommand, S3ToolCredentials, UsageError};
