//! Durable persistence of finalized windows.
//!
//! Moves timestamp-named artifacts from the staging area into the durable
//! storage tree, bucketed by capture date (`<root>/<YYMMDD>/`). The move is
//! idempotent with respect to partial prior runs: artifacts whose target
//! name already exists are skipped, never overwritten. Artifacts still
//! carrying the producer's staged naming are skipped too; they were never
//! finalized and must not be persisted.
//!
//! Staging is typically tmpfs while the durable root is a different
//! filesystem, so a failed rename falls back to copy-and-remove.

use crate::error::AppResult;
use crate::frame;
use crate::store::FrameStore;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome of one persistence pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistReport {
    /// Artifacts moved into the dated bucket.
    pub moved: usize,
    /// Artifacts skipped because the target name already existed.
    pub skipped_existing: usize,
    /// Artifacts skipped because they never received a timestamp name.
    pub skipped_unstamped: usize,
}

/// Moves finalized windows into the durable storage tree.
#[derive(Debug, Clone)]
pub struct PersistenceCoordinator {
    output_root: PathBuf,
}

impl PersistenceCoordinator {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Destination directory for a 6-digit date key.
    pub fn bucket_dir(&self, date_key: &str) -> PathBuf {
        self.output_root.join(date_key)
    }

    /// Move every finalized artifact in the staging area into the dated
    /// bucket, creating it if absent.
    pub fn persist_window(&self, store: &FrameStore, date_key: &str) -> AppResult<PersistReport> {
        let bucket = self.bucket_dir(date_key);
        fs::create_dir_all(&bucket)?;

        let mut report = PersistReport::default();
        for entry in fs::read_dir(store.dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if entry.path().extension().and_then(|e| e.to_str()) != Some("raw") {
                continue;
            }
            if !frame::is_finalized_name(name) {
                report.skipped_unstamped += 1;
                debug!(name, "skipping artifact without timestamp naming");
                continue;
            }

            let target = bucket.join(name);
            if target.exists() {
                report.skipped_existing += 1;
                debug!(name, "skipping artifact already persisted");
                continue;
            }

            move_file(&entry.path(), &target)?;
            report.moved += 1;
        }

        info!(
            bucket = %bucket.display(),
            moved = report.moved,
            skipped_existing = report.skipped_existing,
            skipped_unstamped = report.skipped_unstamped,
            "window persisted"
        );
        Ok(report)
    }
}

/// Rename, with a copy-and-remove fallback for cross-filesystem moves.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.raw_os_error() == Some(libc::EXDEV) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(err) => Err(err),
    }
}
