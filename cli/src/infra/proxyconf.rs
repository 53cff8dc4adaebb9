//! Reads the cluster's proxy settings from the droplet store host.

use anyhow::{Context, Result};
use reqwest::StatusCode;

use crate::application::ports::ProxyConfReader;
use crate::domain::ProxyConf;
use crate::domain::config::DAV_BLOB_STORE_PORT;

/// Fetches `proxyconf.json` published next to the DAV store.
pub struct HttpProxyConfReader {
    client: reqwest::Client,
    url: String,
}

impl HttpProxyConfReader {
    /// Reader for the cluster whose domain is `target`.
    #[must_use]
    pub fn new(target: &str) -> Self {
        Self::with_url(format!("http://{target}:{DAV_BLOB_STORE_PORT}/proxyconf.json"))
    }

    #[must_use]
    pub fn with_url(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

impl ProxyConfReader for HttpProxyConfReader {
    async fn proxy_conf(&self) -> Result<ProxyConf> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("fetching {}", self.url))?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!(url = %self.url, "no proxy configuration published");
                Ok(ProxyConf::default())
            }
            status if status.is_success() => response
                .json()
                .await
                .with_context(|| format!("decoding {}", self.url)),
            status => anyhow::bail!("fetching {} returned {status}", self.url),
        }
    }
}
