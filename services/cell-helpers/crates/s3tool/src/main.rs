//! `s3tool`: moves droplet blobs between a cluster node and S3.
//!
//! Shipped to execution nodes inside the cell-helpers bundle and invoked by
//! the actions the droplet CLI submits. Exit codes: 0 success, 2 operation
//! failure, 3 usage error.

use std::process::ExitCode;

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use droplet_common::{S3ToolCommand, S3ToolCredentials};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: u8 = 2;
const EXIT_USAGE: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, creds) = match S3ToolCommand::parse(&args) {
        Ok(parsed) => parsed,
        Err(usage) => {
            println!("{usage}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let client = connect(&creds).await;
    match execute(&client, &creds.bucket, &command).await {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn connect(creds: &S3ToolCredentials) -> Client {
    let shared = aws_config::defaults(BehaviorVersion::latest())
        .credentials_provider(Credentials::new(
            &creds.access_key,
            &creds.secret_key,
            None,
            None,
            "s3tool",
        ))
        .region(Region::new(creds.region.clone()))
        .load()
        .await;

    let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(true);
    if let Some(endpoint) = std::env::var("AWS_ENDPOINT_OVERRIDE")
        .ok()
        .filter(|e| !e.is_empty())
    {
        tracing::debug!(%endpoint, "using endpoint override");
        builder = builder.endpoint_url(endpoint);
    }
    Client::from_conf(builder.build())
}

async fn execute(client: &Client, bucket: &str, command: &S3ToolCommand) -> Result<String> {
    match command {
        S3ToolCommand::Get {
            remote_path,
            local_path,
        } => {
            let uri = s3_uri(bucket, remote_path);
            let output = client
                .get_object()
                .bucket(bucket)
                .key(remote_path)
                .send()
                .await
                .with_context(|| format!("Error downloading {uri}"))?;

            let mut dest = open_destination(local_path)
                .await
                .with_context(|| format!("Error opening {local_path}"))?;
            let mut body = output.body.into_async_read();
            tokio::io::copy(&mut body, &mut dest)
                .await
                .with_context(|| format!("Error writing response to {local_path}"))?;

            Ok(format!("Downloaded {uri} to {local_path}."))
        }
        S3ToolCommand::Put {
            remote_path,
            local_path,
        } => {
            let uri = s3_uri(bucket, remote_path);
            let body = ByteStream::from_path(local_path)
                .await
                .with_context(|| format!("Error opening {local_path}"))?;
            client
                .put_object()
                .bucket(bucket)
                .key(remote_path)
                .body(body)
                .send()
                .await
                .with_context(|| format!("Error uploading {local_path}"))?;

            Ok(format!("Uploaded {local_path} to {uri}."))
        }
        S3ToolCommand::Delete { remote_path } => {
            let uri = s3_uri(bucket, remote_path);
            client
                .delete_object()
                .bucket(bucket)
                .key(remote_path)
                .send()
                .await
                .with_context(|| format!("Error deleting {uri}"))?;

            Ok(format!("Deleted {uri}."))
        }
    }
}

async fn open_destination(path: &str) -> std::io::Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o644);
    options.open(path).await
}

fn s3_uri(bucket: &str, path: &str) -> String {
    format!("s3://{bucket}/{path}")
}
