//! S3 droplet store.
//!
//! Remote actions shell out to the `s3tool` helper since the executor has no
//! S3-signing primitive; every such action is [`RemoteAction::CredentialedArgv`].

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use chrono::{DateTime, Utc};
use droplet_common::{
    Action, S3TOOL_PATH, S3ToolCommand, S3ToolCredentials, bits_path, droplet_path, result_path,
};

use crate::application::ports::{BlobReader, BlobStore};
use crate::domain::{Blob, RemoteAction, S3Config};

const LOG_SOURCE: &str = "DROPLET";

/// Droplet store backed by an S3 bucket.
pub struct S3BlobStore {
    client: Client,
    config: S3Config,
}

/// Build an S3 client for `config`, with path-style addressing so custom
/// endpoints work.
pub async fn connect(config: &S3Config, endpoint: Option<&str>) -> Client {
    let shared = aws_config::defaults(BehaviorVersion::latest())
        .credentials_provider(Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "droplet-config",
        ))
        .region(Region::new(config.region.clone()))
        .load()
        .await;

    let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(true);
    if let Some(endpoint) = endpoint {
        builder = builder.endpoint_url(endpoint);
    }
    Client::from_conf(builder.build())
}

impl S3BlobStore {
    pub async fn new(config: S3Config, endpoint: Option<&str>) -> Self {
        let client = connect(&config, endpoint).await;
        Self { client, config }
    }

    fn credentials(&self) -> S3ToolCredentials {
        S3ToolCredentials {
            access_key: self.config.access_key.clone(),
            secret_key: self.config.secret_key.clone(),
            bucket: self.config.bucket_name.clone(),
            region: self.config.region.clone(),
        }
    }

    fn s3tool(&self, command: &S3ToolCommand) -> Action {
        Action::run(S3TOOL_PATH, command.to_args(&self.credentials())).in_dir("/")
    }

    fn get(&self, remote_path: String, local_path: &str) -> Action {
        self.s3tool(&S3ToolCommand::Get {
            remote_path,
            local_path: local_path.to_string(),
        })
    }

    fn put(&self, remote_path: String, local_path: &str) -> Action {
        self.s3tool(&S3ToolCommand::Put {
            remote_path,
            local_path: local_path.to_string(),
        })
        .with_log_source(LOG_SOURCE)
    }
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

impl BlobStore for S3BlobStore {
    async fn list(&self) -> Result<Vec<Blob>> {
        let bucket = &self.config.bucket_name;
        let mut blobs = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            tracing::debug!(%bucket, page = blobs.len(), "ListObjectsV2");
            let page = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .with_context(|| format!("listing bucket {bucket}"))?;

            blobs.extend(page.contents().iter().map(|obj| Blob {
                path: obj.key().unwrap_or_default().to_string(),
                size: obj.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                created: obj.last_modified().and_then(to_chrono),
            }));

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }
        Ok(blobs)
    }

    async fn upload(&self, path: &str, file: tokio::fs::File) -> Result<()> {
        tracing::debug!(%path, "PutObject");
        let body = ByteStream::read_from()
            .file(file)
            .build()
            .await
            .context("reading upload source")?;
        self.client
            .put_object()
            .bucket(&self.config.bucket_name)
            .acl(ObjectCannedAcl::Private)
            .key(path)
            .body(body)
            .send()
            .await?;
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<BlobReader> {
        tracing::debug!(%path, "GetObject");
        let output = self
            .client
            .get_object()
            .bucket(&self.config.bucket_name)
            .key(path)
            .send()
            .await?;
        Ok(Box::new(Box::pin(output.body.into_async_read())))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        tracing::debug!(%path, "DeleteObject");
        self.client
            .delete_object()
            .bucket(&self.config.bucket_name)
            .key(path)
            .send()
            .await?;
        Ok(())
    }

    fn download_app_bits_action(&self, droplet_name: &str) -> RemoteAction {
        RemoteAction::CredentialedArgv(
            Action::serial(vec![
                self.get(bits_path(droplet_name), "/tmp/bits.zip"),
                Action::run("/bin/mkdir", ["/tmp/app"]),
                Action::run("/usr/bin/unzip", ["-q", "/tmp/bits.zip"]).in_dir("/tmp/app"),
            ])
            .with_log_source(LOG_SOURCE),
        )
    }

    fn delete_app_bits_action(&self, droplet_name: &str) -> RemoteAction {
        RemoteAction::CredentialedArgv(
            self.s3tool(&S3ToolCommand::Delete {
                remote_path: bits_path(droplet_name),
            })
            .with_log_source(LOG_SOURCE),
        )
    }

    fn upload_droplet_action(&self, droplet_name: &str) -> RemoteAction {
        RemoteAction::CredentialedArgv(self.put(droplet_path(droplet_name), "/tmp/droplet"))
    }

    fn upload_droplet_metadata_action(&self, droplet_name: &str) -> RemoteAction {
        RemoteAction::CredentialedArgv(self.put(result_path(droplet_name), "/tmp/result.json"))
    }

    fn download_droplet_action(&self, droplet_name: &str) -> RemoteAction {
        RemoteAction::CredentialedArgv(
            Action::serial(vec![
                self.get(droplet_path(droplet_name), "/tmp/droplet.tgz"),
                Action::run("/bin/tar", ["zxf", "/tmp/droplet.tgz"]).in_dir("/home/vcap"),
            ])
            .with_log_source(LOG_SOURCE),
        )
    }
}
