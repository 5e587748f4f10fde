//! Shared persistence utilities: atomic file writes and digests.
//!
//! Every file the pipeline produces goes through the same write-to-`.tmp`
//! then rename pattern, so a crashed run never leaves a half-written artifact
//! behind under its final name.

use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Atomically write raw bytes to a file.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let staged = stage(path, data)?;
    staged.commit()
}

/// Staging location for `path`: its full file name with `.tmp` appended, so
/// targets that only differ by extension never share a temporary file.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// A file written to its `.tmp` sibling but not yet renamed into place.
///
/// Dropping a `StagedFile` without committing removes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Final location of the file once committed.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the staged file onto its target path.
    pub fn commit(mut self) -> io::Result<()> {
        std::fs::rename(&self.tmp, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.tmp);
        }
    }
}

/// Write `data` to the [`tmp_path`] of `path`, creating parent directories.
pub fn stage(path: &Path, data: &[u8]) -> io::Result<StagedFile> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, data)?;
    Ok(StagedFile {
        tmp,
        target: path.to_path_buf(),
        committed: false,
    })
}

/// Compute SHA-256 hash of arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
