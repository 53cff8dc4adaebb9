//! Buildpack alias catalog.

use std::collections::BTreeMap;

use anyhow::Result;
use url::Url;

use crate::domain::error::ConfigError;

/// Built-in aliases, each resolving to the upstream Cloud Foundry buildpack.
pub const DEFAULT_BUILDPACKS: &[(&str, &str)] = &[
    ("go", "https://github.com/cloudfoundry/go-buildpack.git"),
    ("java", "https://github.com/cloudfoundry/java-buildpack.git"),
    ("python", "https://github.com/cloudfoundry/python-buildpack.git"),
    ("ruby", "https://github.com/cloudfoundry/ruby-buildpack.git"),
    ("nodejs", "https://github.com/cloudfoundry/nodejs-buildpack.git"),
    ("php", "https://github.com/cloudfoundry/php-buildpack.git"),
    ("binary", "https://github.com/cloudfoundry/binary-buildpack.git"),
    (
        "staticfile",
        "https://github.com/cloudfoundry/staticfile-buildpack.git",
    ),
];

/// Immutable alias → URL map, built once from defaults plus user aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildpackCatalog {
    aliases: BTreeMap<String, String>,
}

impl Default for BuildpackCatalog {
    fn default() -> Self {
        Self::new(&BTreeMap::new())
    }
}

impl BuildpackCatalog {
    /// Defaults overlaid with `extra`; an extra alias replaces a default one.
    #[must_use]
    pub fn new(extra: &BTreeMap<String, String>) -> Self {
        let mut aliases: BTreeMap<String, String> = DEFAULT_BUILDPACKS
            .iter()
            .map(|(name, url)| ((*name).to_string(), (*url).to_string()))
            .collect();
        aliases.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { aliases }
    }

    /// Resolve an alias or an absolute URL to the buildpack URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownBuildpack`] when `buildpack` is neither a
    /// known alias nor an absolute URL.
    pub fn resolve(&self, buildpack: &str) -> Result<String> {
        if let Some(url) = self.aliases.get(buildpack) {
            return Ok(url.clone());
        }
        match Url::parse(buildpack) {
            Ok(url) if !url.cannot_be_a_base() => Ok(buildpack.to_string()),
            _ => Err(ConfigError::UnknownBuildpack(buildpack.to_string()).into()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
