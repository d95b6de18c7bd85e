//! Memory pressure monitoring for the staging area.
//!
//! The staging area is a fixed-size ram-backed filesystem shared with the
//! rest of the system, so free capacity changes continuously as frames are
//! produced and evicted. The monitor re-queries the probe on every poll; a
//! cached value would keep the controller running into a full filesystem.
//!
//! This is a pure query layer. Acting on pressure (stopping capture,
//! transitioning phases) is the controller's job; the monitor never deletes
//! data itself.

use std::io;
use std::sync::Arc;
use tracing::warn;

/// Source of free-capacity readings for the staging filesystem.
///
/// `FrameStore` implements this with statvfs; tests inject fixed or scripted
/// probes.
pub trait CapacityProbe: Send + Sync {
    fn free_bytes(&self) -> io::Result<u64>;
}

/// Watches free capacity against a configured floor.
#[derive(Clone)]
pub struct MemoryPressureMonitor {
    probe: Arc<dyn CapacityProbe>,
    floor_bytes: u64,
}

impl MemoryPressureMonitor {
    pub fn new(probe: Arc<dyn CapacityProbe>, floor_bytes: u64) -> Self {
        Self { probe, floor_bytes }
    }

    /// Available bytes on the staging filesystem, freshly queried.
    ///
    /// A probe failure reads as zero capacity: an unreadable filesystem is
    /// treated the same as a full one, forcing an orderly stop instead of
    /// letting the producer run blind.
    pub fn free_capacity(&self) -> u64 {
        match self.probe.free_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, "capacity probe failed; treating staging area as full");
                0
            }
        }
    }

    /// True once free capacity has fallen below the configured floor.
    pub fn must_stop(&self) -> bool {
        self.free_capacity() < self.floor_bytes
    }

    /// The configured floor in bytes.
    pub fn floor_bytes(&self) -> u64 {
        self.floor_bytes
    }
}
