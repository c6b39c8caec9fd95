use crate::error::{Result, SyncError};
use std::path::{Component, Path, PathBuf};

/// Path checks applied before the mod directory is mutated.
pub struct PathValidator;

impl PathValidator {
    /// Validates and canonicalises the mod directory.
    pub fn validate_mod_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| SyncError::ModDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;

        if !canonical.is_dir() {
            return Err(SyncError::Config(format!(
                "Mod directory '{}' is not a directory",
                canonical.display()
            )));
        }

        const FORBIDDEN: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

        for forbidden in FORBIDDEN {
            let forbidden_path = Path::new(forbidden);

            let inside = canonical.starts_with(forbidden_path)
                || forbidden_path
                    .canonicalize()
                    .is_ok_and(|c| canonical.starts_with(c));
            if inside {
                return Err(SyncError::Config(format!(
                    "Refusing to manage mods inside system directory '{}'",
                    forbidden
                )));
            }
        }

        Ok(canonical)
    }

    /// Ensures a registry-provided file name is a single plain component,
    /// so joining it onto the mod directory cannot escape it.
    pub fn validate_file_name(name: &str) -> Result<&str> {
        let mut components = Path::new(name).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(c)), None) if c == name
        );

        if !single_normal || name.contains(['/', '\\']) {
            return Err(SyncError::UnsafeFileName(name.to_string()));
        }

        Ok(name)
    }
}
