//! Blob and droplet model.
//!
//! Droplets are not stored as records. They are reconstructed from the blob
//! listing by grouping on the first path segment; a group is a droplet only
//! once it holds a `droplet.tgz`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::Result;
use chrono::{DateTime, Utc};
use droplet_common::DROPLET_TGZ;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::DropletError;

/// An opaque remote object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    /// Hierarchical key, `<droplet-name>/<kind>`.
    pub path: String,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
}

/// A complete droplet, projected from its `droplet.tgz` blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Droplet {
    pub name: String,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
}

static DROPLET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").unwrap()
});

/// Droplet names become blob key prefixes, so they may not contain `/`.
///
/// # Errors
///
/// Returns [`DropletError::InvalidName`] for empty names or names with
/// characters outside `[A-Za-z0-9_.-]`.
pub fn validate_droplet_name(name: &str) -> Result<()> {
    if !DROPLET_NAME.is_match(name) {
        return Err(DropletError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

/// Split `<name>/<kind>` into its two segments. Keys with any other depth
/// do not belong to the droplet model.
fn split_droplet_key(path: &str) -> Option<(&str, &str)> {
    let (name, kind) = path.split_once('/')?;
    if name.is_empty() || kind.is_empty() || kind.contains('/') {
        return None;
    }
    Some((name, kind))
}

/// Group blobs into droplets, keeping only groups with a `droplet.tgz`.
///
/// Result order follows droplet name; presentation order is the caller's
/// concern (see [`sort_newest_first`]).
#[must_use]
pub fn droplets_from_blobs(blobs: &[Blob]) -> Vec<Droplet> {
    let mut droplets: BTreeMap<&str, Droplet> = BTreeMap::new();
    for blob in blobs {
        let Some((name, kind)) = split_droplet_key(&blob.path) else {
            continue;
        };
        if kind == DROPLET_TGZ {
            droplets.insert(
                name,
                Droplet {
                    name: name.to_string(),
                    size: blob.size,
                    created: blob.created,
                },
            );
        }
    }
    droplets.into_values().collect()
}

/// Blobs whose first path segment equals `droplet_name`, in listing order.
#[must_use]
pub fn blobs_for_droplet<'a>(blobs: &'a [Blob], droplet_name: &str) -> Vec<&'a Blob> {
    blobs
        .iter()
        .filter(|b| b.path.split('/').next() == Some(droplet_name))
        .collect()
}

/// Newest first; droplets without a creation time go last.
pub fn sort_newest_first(droplets: &mut [Droplet]) {
    droplets.sort_by(|a, b| match (a.created, b.created) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

// ── Ownership annotation ──────────────────────────────────────────────────────

/// Annotation written on apps launched from a droplet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DropletAnnotation {
    pub droplet_source: DropletSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DropletSource {
    pub droplet_name: String,
}

impl DropletAnnotation {
    #[must_use]
    pub fn new(droplet_name: &str) -> Self {
        Self {
            droplet_source: DropletSource {
                droplet_name: droplet_name.to_string(),
            },
        }
    }

    /// Serialize for the app's annotation field.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The droplet an app annotation points at.
///
/// An absent or malformed annotation means "no association". Deletion
/// availability is favoured over strict auditing here.
#[must_use]
pub fn annotated_droplet(annotation: &str) -> Option<String> {
    if annotation.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<DropletAnnotation>(annotation) {
        Ok(parsed) => Some(parsed.droplet_source.droplet_name),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unparseable app annotation");
            None
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
