use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to read mod directory '{path}': {source}")]
    ModDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid version '{version}': {reason}")]
    VersionParse { version: String, reason: String },

    #[error("Mod '{0}' was not found in the registry")]
    ModNotFound(String),

    #[error("Mod '{0}' has no published releases")]
    NoReleases(String),

    #[error("Registry request failed: {0}")]
    Registry(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Refusing to install release with unsafe file name '{0}'")]
    UnsafeFileName(String),

    #[error("Failed to change owner of '{path}': {source}")]
    Ownership {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{failed} of {total} mod update(s) failed")]
    ModsFailed { failed: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
