use crate::config::Owner;
use crate::error::{Result, SyncError};
use crate::registry::{Mod, ModRegistry, Release};
use crate::utils::path_validator::PathValidator;
use indicatif::{ProgressBar, ProgressStyle};
use sha1::{Digest, Sha1};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Result of a successful installation
#[derive(Debug, Clone)]
pub struct InstalledMod {
    pub path: PathBuf,
    pub sha1: String,
    pub removed: Option<PathBuf>,
}

/// ModInstaller downloads a release, verifies it and swaps it into the mod directory
pub struct ModInstaller<'a> {
    registry: &'a dyn ModRegistry,
    mod_dir: PathBuf,
    owner: Option<Owner>,
}

impl<'a> ModInstaller<'a> {
    pub fn new<P: AsRef<Path>>(
        registry: &'a dyn ModRegistry,
        mod_dir: P,
        owner: Option<Owner>,
    ) -> Self {
        Self {
            registry,
            mod_dir: mod_dir.as_ref().to_path_buf(),
            owner,
        }
    }

    /// Install the newest release of `remote` and remove `old_file_name`.
    ///
    /// The payload is streamed into a temporary file next to its final
    /// location and only renamed into place once the SHA-1 digest matches,
    /// so a failed download never touches the installed archive.
    pub fn install(&self, remote: &Mod, old_file_name: &str) -> Result<InstalledMod> {
        let release = remote.newest_release()?;
        let file_name = PathValidator::validate_file_name(&release.file_name)?;
        let destination = self.mod_dir.join(file_name);

        let (staged, sha1) = self.download_verified(remote, release)?;

        if let Some(owner) = self.owner {
            Self::apply_owner(staged.path(), owner)?;
        }
        Self::make_readable(staged.path())?;

        staged
            .persist(&destination)
            .map_err(|e| SyncError::Io(e.error))?;
        info!(path = %destination.display(), "Installed release");

        let removed = if old_file_name != file_name {
            let old_path = self.mod_dir.join(old_file_name);
            std::fs::remove_file(&old_path)?;
            debug!(path = %old_path.display(), "Removed superseded archive");
            Some(old_path)
        } else {
            None
        };

        Ok(InstalledMod {
            path: destination,
            sha1,
            removed,
        })
    }

    fn download_verified(&self, remote: &Mod, release: &Release) -> Result<(NamedTempFile, String)> {
        let payload = self.registry.download(&release.download_path)?;
        let mut staged = NamedTempFile::with_prefix_in(".modsync-", &self.mod_dir)?;

        let progress = Self::progress_bar(payload.len, &release.file_name);
        let mut writer = HashingWriter::new(staged.as_file_mut());
        io::copy(&mut progress.wrap_read(payload.reader), &mut writer)?;
        progress.finish_and_clear();

        let actual = writer.finalize_hex();
        staged.as_file_mut().sync_all()?;
        debug!(mod_name = %remote.name, sha1 = %actual, "Download finished");

        if !actual.eq_ignore_ascii_case(release.sha1_hex.trim()) {
            return Err(SyncError::ChecksumMismatch {
                file: release.file_name.clone(),
                expected: release.sha1_hex.clone(),
                actual,
            });
        }

        Ok((staged, actual))
    }

    fn progress_bar(len: Option<u64>, file_name: &str) -> ProgressBar {
        let (bar, template) = match len {
            Some(len) => (
                ProgressBar::new(len),
                "  [{bar:40}] {bytes}/{total_bytes} {msg}",
            ),
            None => (ProgressBar::new_spinner(), "  {spinner} {bytes} {msg}"),
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.set_message(file_name.to_string());
        bar
    }

    #[cfg(unix)]
    fn apply_owner(path: &Path, owner: Owner) -> Result<()> {
        std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid)).map_err(|source| {
            SyncError::Ownership {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    #[cfg(not(unix))]
    fn apply_owner(_path: &Path, _owner: Owner) -> Result<()> {
        Ok(())
    }

    // Temp files are created 0600; the server account must be able to read it.
    #[cfg(unix)]
    fn make_readable(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn make_readable(_path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Writer that feeds everything it writes into a SHA-1 digest.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha1,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha1::new(),
        }
    }

    fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
