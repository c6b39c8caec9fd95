use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;

pub mod portal;
pub mod version;

pub use portal::ModPortalClient;
pub use version::ModVersion;

/// Response of the bulk metadata query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModResult {
    pub results: Vec<Mod>,
}

impl ModResult {
    /// Index the returned mods by name.
    pub fn into_index(self) -> HashMap<String, Mod> {
        self.results
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect()
    }
}

/// A mod as known by the registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Mod {
    pub title: String,
    pub name: String,
    #[serde(default)]
    pub releases: Vec<Release>,
}

impl Mod {
    /// The newest release, which the registry lists last.
    pub fn newest_release(&self) -> Result<&Release> {
        self.releases
            .last()
            .ok_or_else(|| SyncError::NoReleases(self.name.clone()))
    }
}

/// One published version of a mod.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Release {
    #[serde(rename = "download_url")]
    pub download_path: String,
    pub file_name: String,
    pub version: String,
    #[serde(rename = "sha1")]
    pub sha1_hex: String,
}

/// A download in progress. `len` is the advertised size when known.
pub struct Payload {
    pub reader: Box<dyn Read>,
    pub len: Option<u64>,
}

/// Access to a mod registry.
pub trait ModRegistry {
    /// Fetch metadata for every mod in `names` with a single request.
    fn fetch_metadata(&self, names: &[String]) -> Result<ModResult>;

    /// Open the binary payload of a release by its registry-relative path.
    fn download(&self, download_path: &str) -> Result<Payload>;
}
