use crate::error::{Result, SyncError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ARCHIVE_EXTENSION: &str = "zip";

/// An installed mod archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMod {
    pub name: String,
    pub file_name: String,
    pub version: String,
}

impl LocalMod {
    /// Split `<name>_<version>.zip` into its parts.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let base = file_name.strip_suffix(".zip")?;
        let mut parts = base.split('_');
        let name = parts.next().filter(|n| !n.is_empty())?;
        let version = parts.next().filter(|v| !v.is_empty())?;

        Some(Self {
            name: name.to_string(),
            file_name: file_name.to_string(),
            version: version.to_string(),
        })
    }
}

/// ModScannerAgent builds the local inventory from a mod directory
pub struct ModScannerAgent {
    mod_dir: PathBuf,
}

impl ModScannerAgent {
    pub fn new<P: AsRef<Path>>(mod_dir: P) -> Self {
        Self {
            mod_dir: mod_dir.as_ref().to_path_buf(),
        }
    }

    /// List the mod archives in the directory, keyed and ordered by mod name.
    /// A later archive for the same name replaces the earlier one.
    pub fn scan(&self) -> Result<BTreeMap<String, LocalMod>> {
        let directory_error = |source| SyncError::ModDirectory {
            path: self.mod_dir.clone(),
            source,
        };

        let mut file_names = Vec::new();
        for entry in std::fs::read_dir(&self.mod_dir).map_err(directory_error)? {
            let entry = entry.map_err(directory_error)?;
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION)
            {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                file_names.push(name.to_string());
            }
        }
        file_names.sort();

        let mut mods = BTreeMap::new();
        for file_name in file_names {
            match LocalMod::from_file_name(&file_name) {
                Some(local) => {
                    debug!(name = %local.name, version = %local.version, "Found mod archive");
                    if let Some(previous) = mods.insert(local.name.clone(), local) {
                        warn!(file = %previous.file_name, "Ignoring duplicate archive");
                    }
                }
                None => warn!(file = %file_name, "Skipping archive without <name>_<version>.zip layout"),
            }
        }

        Ok(mods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn splits_name_and_version() {
        for (name, version) in [
            ("alien-biomes", "1.0.0"),
            ("Krastorio2", "1.3.24"),
            ("space-exploration", "0.6.138"),
        ] {
            let local = LocalMod::from_file_name(&format!("{name}_{version}.zip")).unwrap();
            assert_eq!(local.name, name);
            assert_eq!(local.version, version);
            assert_eq!(local.file_name, format!("{name}_{version}.zip"));
        }
    }

    #[test]
    fn rejects_names_without_version() {
        assert!(LocalMod::from_file_name("mod-list.zip").is_none());
        assert!(LocalMod::from_file_name("_1.0.0.zip").is_none());
        assert!(LocalMod::from_file_name("foo_.zip").is_none());
        assert!(LocalMod::from_file_name("foo_1.0.0.tar").is_none());
    }

    #[test]
    fn scans_only_zip_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("alien-biomes_1.0.0.zip"), b"a").unwrap();
        fs::write(dir.path().join("Krastorio2_1.3.24.zip"), b"b").unwrap();
        fs::write(dir.path().join("mod-list.json"), b"{}").unwrap();
        fs::write(dir.path().join("mod-settings.dat"), b"").unwrap();
        fs::create_dir(dir.path().join("folder_1.0.0.zip")).unwrap();

        let mods = ModScannerAgent::new(dir.path()).scan().unwrap();
        let names: Vec<_> = mods.keys().cloned().collect();
        assert_eq!(names, vec!["Krastorio2", "alien-biomes"]);
        assert_eq!(mods["alien-biomes"].version, "1.0.0");
    }

    #[test]
    fn later_duplicate_wins() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo_1.0.0.zip"), b"").unwrap();
        fs::write(dir.path().join("foo_1.1.0.zip"), b"").unwrap();

        let mods = ModScannerAgent::new(dir.path()).scan().unwrap();
        assert_eq!(mods.len(), 1);
        assert_eq!(mods["foo"].version, "1.1.0");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let err = ModScannerAgent::new(dir.path().join("missing"))
            .scan()
            .unwrap_err();
        assert!(matches!(err, SyncError::ModDirectory { .. }));
    }
}
