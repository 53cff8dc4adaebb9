//! Application context: unified state passed to every command handler.
//!
//! `AppContext` owns the output context and the config store, and builds the
//! cluster-facing adapters from the loaded configuration on demand, so
//! commands that never touch the network never construct a client.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::{BlobStoreError, DropletConfig};
use crate::infra::blob_store::{AnyBlobStore, S3_ENDPOINT_ENV};
use crate::infra::config::YamlConfigStore;
use crate::infra::proxyconf::HttpProxyConfReader;
use crate::infra::receptor::ReceptorClient;
use crate::infra::verifier::StoreVerifier;
use crate::output::OutputContext;

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Persistent configuration file.
    pub config_store: YamlConfigStore,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: &OutputFlags) -> Self {
        Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            config_store: YamlConfigStore,
        }
    }

    /// Load the persisted configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read.
    pub fn load_config(&self) -> Result<DropletConfig> {
        self.config_store.load()
    }

    /// Endpoint override for S3-compatible stores.
    #[must_use]
    pub fn s3_endpoint() -> Option<String> {
        std::env::var(S3_ENDPOINT_ENV).ok().filter(|v| !v.is_empty())
    }

    /// The droplet store named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::NotConfigured`] when no store is set.
    pub async fn blob_store(&self, config: &DropletConfig) -> Result<AnyBlobStore> {
        let store = config
            .blob_store
            .as_ref()
            .ok_or(BlobStoreError::NotConfigured)?;
        AnyBlobStore::connect(store, Self::s3_endpoint().as_deref()).await
    }

    #[must_use]
    pub fn verifier(&self) -> StoreVerifier {
        StoreVerifier::new(Self::s3_endpoint())
    }

    /// Scheduler client for the targeted cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if no target is set.
    pub fn receptor(&self, config: &DropletConfig) -> Result<ReceptorClient> {
        ReceptorClient::new(&config.receptor_url()?, &config.username, &config.password)
    }

    /// Proxy settings reader for the targeted cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if no target is set.
    pub fn proxy_conf_reader(&self, config: &DropletConfig) -> Result<HttpProxyConfReader> {
        Ok(HttpProxyConfReader::new(config.require_target()?))
    }

    /// Prompt for a line of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn prompt(&self, prompt: &str) -> Result<String> {
        let value = dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(value)
    }

    /// Prompt for a secret without echoing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn prompt_password(&self, prompt: &str) -> Result<String> {
        let value = dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        Ok(value)
    }
}
