//! Blob path convention shared with the staging and launch tooling.
//!
//! Every droplet owns up to three blobs under a common name prefix:
//! `<name>/bits.zip`, `<name>/droplet.tgz` and `<name>/result.json`.

pub const BITS_ZIP: &str = "bits.zip";
pub const DROPLET_TGZ: &str = "droplet.tgz";
pub const RESULT_JSON: &str = "result.json";

#[must_use]
pub fn bits_path(droplet_name: &str) -> String {
    format!("{droplet_name}/{BITS_ZIP}")
}

#[must_use]
pub fn droplet_path(droplet_name: &str) -> String {
    format!("{droplet_name}/{DROPLET_TGZ}")
}

#[must_use]
pub fn result_path(droplet_name: &str) -> String {
    format!("{droplet_name}/{RESULT_JSON}")
}
