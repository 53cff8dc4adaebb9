//! Proxy settings injected into build and launch environments.

use serde::Deserialize;

/// Cluster-wide proxy configuration. Empty strings mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxyConf {
    pub http_proxy: String,
    pub https_proxy: String,
    pub no_proxy: String,
}

impl ProxyConf {
    /// The three variables in the order they are appended to environments.
    /// All three are always present, empty or not.
    #[must_use]
    pub fn env_vars(&self) -> [(&'static str, String); 3] {
        [
            ("http_proxy", self.http_proxy.clone()),
            ("https_proxy", self.https_proxy.clone()),
            ("no_proxy", self.no_proxy.clone()),
        ]
    }
}
