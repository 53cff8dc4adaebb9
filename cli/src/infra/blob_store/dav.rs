//! WebDAV droplet store rooted at `http://<host>:<port>/blobs/`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use droplet_common::{Action, bits_path, droplet_path, result_path};
use futures_util::TryStreamExt as _;
use reqwest::{Method, RequestBuilder, StatusCode};
use tokio_util::io::StreamReader;
use url::Url;

use crate::application::ports::{BlobReader, BlobStore};
use crate::domain::{Blob, BlobStoreError, DavConfig, RemoteAction};

/// Cluster-side DAV client unpacked from the cell-helpers bundle.
pub const DAVTOOL_PATH: &str = "/tmp/davtool";

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:"><D:prop><D:resourcetype/><D:getcontentlength/><D:getlastmodified/></D:prop></D:propfind>"#;

/// Droplet store backed by a WebDAV server.
pub struct DavBlobStore {
    client: reqwest::Client,
    config: DavConfig,
    base: Url,
}

/// One `<D:response>` of a multistatus document.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DavEntry {
    href: String,
    is_collection: bool,
    size: u64,
    modified: Option<DateTime<Utc>>,
}

impl DavBlobStore {
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid URL.
    pub fn new(config: DavConfig) -> Result<Self> {
        let base = Url::parse(&format!("http://{}:{}/blobs/", config.host, config.port))
            .with_context(|| format!("invalid droplet store address {}:{}", config.host, config.port))?;
        Ok(Self {
            client: reqwest::Client::new(),
            config,
            base,
        })
    }

    fn blob_url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("invalid blob path {path}"))
    }

    /// URL handed to the cluster, carrying the credentials as userinfo.
    fn action_url(&self, path: &str) -> String {
        let mut url = self.base.clone();
        if !self.config.username.is_empty() {
            // Infallible for http URLs with a host.
            let _ = url.set_username(&self.config.username);
            let _ = url.set_password(Some(&self.config.password));
        }
        format!("{url}{path}")
    }

    fn has_credentials(&self) -> bool {
        !self.config.username.is_empty()
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        if self.has_credentials() {
            builder.basic_auth(&self.config.username, Some(&self.config.password))
        } else {
            builder
        }
    }

    fn davtool(&self, args: Vec<String>) -> RemoteAction {
        let action = Action::run(DAVTOOL_PATH, args).in_dir("/");
        if self.has_credentials() {
            RemoteAction::CredentialedArgv(action)
        } else {
            RemoteAction::Direct(action)
        }
    }

    /// Issue a depth-1 PROPFIND against the store root and return the status.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    pub async fn probe(&self) -> Result<StatusCode> {
        let response = self
            .propfind_request(self.base.clone())?
            .send()
            .await
            .with_context(|| format!("connecting to {}", self.base))?;
        Ok(response.status())
    }

    fn propfind_request(&self, url: Url) -> Result<RequestBuilder> {
        let method = Method::from_bytes(b"PROPFIND")?;
        Ok(self
            .request(method, url)
            .header("Depth", "1")
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(PROPFIND_BODY))
    }

    async fn propfind(&self, url: &Url) -> Result<Vec<DavEntry>> {
        tracing::debug!(path = %url.path(), "PROPFIND");
        let response = self.propfind_request(url.clone())?.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(unexpected("PROPFIND", url, status));
        }
        let body = response.text().await?;
        parse_multistatus(&body)
    }
}

fn unexpected(method: &str, url: &Url, status: StatusCode) -> anyhow::Error {
    BlobStoreError::UnexpectedStatus {
        method: method.to_string(),
        path: url.path().to_string(),
        status: status.as_u16(),
    }
    .into()
}

fn parse_multistatus(body: &str) -> Result<Vec<DavEntry>> {
    let doc = roxmltree::Document::parse(body)
        .map_err(|e| BlobStoreError::MalformedListing(e.to_string()))?;

    let child_text = |node: roxmltree::Node<'_, '_>, name: &str| {
        node.descendants()
            .find(|n| n.is_element() && n.tag_name().name() == name)
            .and_then(|n| n.text())
            .map(str::trim)
            .map(ToString::to_string)
    };

    let mut entries = Vec::new();
    for response in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "response")
    {
        let Some(href) = child_text(response, "href") else {
            return Err(BlobStoreError::MalformedListing("response without href".to_string()).into());
        };
        let is_collection = response
            .descendants()
            .any(|n| n.is_element() && n.tag_name().name() == "collection");
        let size = child_text(response, "getcontentlength")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let modified = child_text(response, "getlastmodified")
            .and_then(|s| DateTime::parse_from_rfc2822(&s).ok())
            .map(|d| d.with_timezone(&Utc));
        entries.push(DavEntry {
            href,
            is_collection,
            size,
            modified,
        });
    }
    Ok(entries)
}

impl BlobStore for DavBlobStore {
    async fn list(&self) -> Result<Vec<Blob>> {
        let mut blobs = Vec::new();
        let mut pending = vec![self.base.clone()];

        while let Some(collection) = pending.pop() {
            for entry in self.propfind(&collection).await? {
                let url = collection
                    .join(&entry.href)
                    .with_context(|| format!("invalid href {}", entry.href))?;
                if url.path().trim_end_matches('/') == collection.path().trim_end_matches('/') {
                    continue;
                }
                if entry.is_collection {
                    let mut child = url;
                    if !child.path().ends_with('/') {
                        let path = format!("{}/", child.path());
                        child.set_path(&path);
                    }
                    pending.push(child);
                    continue;
                }
                let Some(path) = url.path().strip_prefix(self.base.path()) else {
                    continue;
                };
                blobs.push(Blob {
                    path: path.to_string(),
                    size: entry.size,
                    created: entry.modified,
                });
            }
        }

        blobs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(blobs)
    }

    async fn upload(&self, path: &str, file: tokio::fs::File) -> Result<()> {
        let url = self.blob_url(path)?;
        tracing::debug!(%path, "PUT");
        let response = self.request(Method::PUT, url.clone()).body(file).send().await?;
        if !response.status().is_success() {
            return Err(unexpected("PUT", &url, response.status()));
        }
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<BlobReader> {
        let url = self.blob_url(path)?;
        tracing::debug!(%path, "GET");
        let response = self.request(Method::GET, url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(unexpected("GET", &url, response.status()));
        }
        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(stream))))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.blob_url(path)?;
        tracing::debug!(%path, "DELETE");
        let response = self.request(Method::DELETE, url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(unexpected("DELETE", &url, response.status()));
        }
        Ok(())
    }

    fn download_app_bits_action(&self, droplet_name: &str) -> RemoteAction {
        RemoteAction::Direct(Action::download(
            self.action_url(&bits_path(droplet_name)),
            "/tmp/app",
        ))
    }

    fn delete_app_bits_action(&self, droplet_name: &str) -> RemoteAction {
        self.davtool(vec![
            "delete".to_string(),
            self.action_url(&bits_path(droplet_name)),
        ])
    }

    fn upload_droplet_action(&self, droplet_name: &str) -> RemoteAction {
        RemoteAction::Direct(Action::upload(
            "/tmp/droplet",
            self.action_url(&droplet_path(droplet_name)),
        ))
    }

    fn upload_droplet_metadata_action(&self, droplet_name: &str) -> RemoteAction {
        RemoteAction::Direct(Action::upload(
            "/tmp/result.json",
            self.action_url(&result_path(droplet_name)),
        ))
    }

    fn download_droplet_action(&self, droplet_name: &str) -> RemoteAction {
        RemoteAction::Direct(Action::download(
            self.action_url(&droplet_path(droplet_name)),
            "/home/vcap",
        ))
    }
}
