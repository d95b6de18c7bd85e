//! Staging-area abstraction.
//!
//! `FrameStore` wraps the transient directory the producer writes into
//! (typically tmpfs such as `/run/shm`). It enumerates staged frames in
//! sequence order, deletes and renames artifacts, and reports free capacity
//! for the pressure monitor.
//!
//! Deletes and renames are best-effort: the producer and a previous eviction
//! pass are the only other writers, and losing a race to either is expected,
//! not an error.

use crate::error::AppResult;
use crate::frame::{self, StagedFrame};
use crate::pressure::CapacityProbe;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Abstraction over the transient staging directory.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The staging directory root.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Enumerate staged frames, sorted by sequence number.
    ///
    /// Files that do not match the producer naming scheme are ignored.
    pub fn scan_staged(&self) -> AppResult<Vec<StagedFrame>> {
        let mut frames = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(seq) = frame::parse_staged_name(name) {
                frames.push(StagedFrame {
                    seq,
                    path: entry.path(),
                });
            }
        }
        frames.sort();
        Ok(frames)
    }

    /// Enumerate finalized (timestamp-named) artifacts awaiting persistence.
    pub fn scan_finalized(&self) -> AppResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if frame::is_finalized_name(name) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Delete every raw artifact in the staging directory.
    ///
    /// Run once at startup and again when re-arming, so a crashed or
    /// interrupted earlier run cannot leak stale frames into a new window.
    pub fn sweep(&self) -> AppResult<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) == Some("raw")
                && self.remove_path(&entry.path())
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Best-effort delete of a single artifact.
    ///
    /// Returns false if the file was already gone.
    pub fn remove_path(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "staged frame already removed");
                false
            }
            Err(err) => {
                debug!(path = %path.display(), %err, "failed to remove staged frame");
                false
            }
        }
    }

    /// Best-effort rename of a staged artifact to a new name in place.
    ///
    /// Returns false if the source vanished before the rename.
    pub fn rename_if_present(&self, from: &Path, to_name: &str) -> AppResult<bool> {
        if !from.exists() {
            debug!(path = %from.display(), "staged frame gone before rename");
            return Ok(false);
        }
        fs::rename(from, self.dir.join(to_name))?;
        Ok(true)
    }

    /// Byte length of one staged artifact.
    pub fn artifact_len(&self, path: &Path) -> AppResult<u64> {
        Ok(fs::metadata(path)?.len())
    }
}

impl CapacityProbe for FrameStore {
    fn free_bytes(&self) -> io::Result<u64> {
        free_capacity(&self.dir)
    }
}

/// Free capacity of the filesystem holding `path`, in bytes.
#[cfg(unix)]
pub fn free_capacity(path: &Path) -> io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let path_cstr = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))?;

    // SAFETY: statvfs writes into the zeroed struct we hand it and reads the
    // NUL-terminated path; both stay alive for the duration of the call.
    unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(path_cstr.as_ptr(), &mut stat) == 0 {
            Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(not(unix))]
pub fn free_capacity(_path: &Path) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "free capacity probe is only implemented for unix",
    ))
}
