//! Per-invocation scratch directories.
//!
//! Every pipeline run gets its own uniquely named directory. It is removed
//! when the run ends, whether the run succeeded or not.

use std::path::{Path, PathBuf};

use rhythmcam_common::error::{RhythmError, RhythmResult};
use tempfile::TempDir;

/// A scratch directory owned by one pipeline invocation.
#[derive(Debug)]
pub struct ScratchArea {
    dir: TempDir,
}

impl ScratchArea {
    /// Create a fresh directory named `<prefix>XXXX` under `base`
    /// (or the system temp dir).
    pub fn create(base: Option<&Path>, prefix: &str) -> RhythmResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match base {
            Some(base) => {
                std::fs::create_dir_all(base)?;
                builder.tempdir_in(base)?
            }
            None => builder.tempdir()?,
        };
        tracing::debug!(path = %dir.path().display(), "scratch area created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the directory now, logging instead of failing.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(err) = self.dir.close() {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove scratch area");
        }
    }
}

/// Move a finished file from scratch into place.
///
/// Falls back to copy + remove across filesystems; a failed copy never
/// leaves a partial file at `dest`.
pub fn persist(src: &Path, dest: &Path) -> RhythmResult<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    if let Err(err) = std::fs::copy(src, dest) {
        let _ = std::fs::remove_file(dest);
        return Err(RhythmError::Io(err));
    }
    let _ = std::fs::remove_file(src);
    Ok(())
}
