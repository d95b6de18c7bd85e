//! Live frame retention and eviction.
//!
//! `RingBufferManager` owns the set of staged frames that are still "live",
//! meaning not yet frozen into a trigger window. Each control tick it
//! re-enumerates the staging directory (the producer is the only other
//! writer and uses strictly increasing sequence numbers, so a rescan is
//! race-free) and then trims the surplus.
//!
//! Retention policy:
//! - Never evict during warm-up: the pre-trigger guarantee needs at least
//!   `pre_frames` buffered before anything may be deleted.
//! - Once warmed, evict the oldest frames beyond the newest `pre_frames`.
//! - Never evict a frame that belongs to a frozen window.
//! - Never evict the newest staged artifact; the producer may still be
//!   writing it.

use crate::error::AppResult;
use crate::frame::StagedFrame;
use crate::store::FrameStore;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Maintains the ordered set of live staged frames.
pub struct RingBufferManager {
    store: FrameStore,
    pre_frames: usize,
    frames: Vec<StagedFrame>,
}

impl RingBufferManager {
    pub fn new(store: FrameStore, pre_frames: usize) -> Self {
        Self {
            store,
            pre_frames,
            frames: Vec::new(),
        }
    }

    /// Rescan the staging directory and incorporate newly produced frames.
    ///
    /// Returns the number of frames admitted since the last scan.
    pub fn admit(&mut self) -> AppResult<usize> {
        let scanned = self.store.scan_staged()?;
        let last_seq = self.frames.last().map(|f| f.seq);
        let admitted = match last_seq {
            Some(last) => scanned.iter().filter(|f| f.seq > last).count(),
            None => scanned.len(),
        };
        if admitted > 0 {
            trace!(admitted, total = scanned.len(), "admitted staged frames");
        }
        self.frames = scanned;
        Ok(admitted)
    }

    /// Evict the oldest frames beyond the retained window.
    ///
    /// No-op until the buffer has warmed to `pre_frames`. Frames whose
    /// sequence numbers appear in `frozen` are skipped. Individual deletes
    /// are best-effort; a frame already removed by a race is skipped.
    ///
    /// Returns the number of artifacts actually deleted.
    pub fn evict_excess(&mut self, frozen: &HashSet<u64>) -> AppResult<usize> {
        if self.frames.len() <= self.pre_frames {
            return Ok(0);
        }

        // Everything older than the newest `pre_frames` is surplus. The
        // newest artifact is inside that retained tail, so it survives every
        // pass even with pre_frames == 1.
        let surplus_end = self.frames.len() - self.pre_frames;
        let mut evicted = 0;
        let mut kept = Vec::with_capacity(self.frames.len() - surplus_end);

        for (idx, frame) in self.frames.drain(..).enumerate() {
            if idx >= surplus_end || frozen.contains(&frame.seq) {
                kept.push(frame);
                continue;
            }
            if self.store.remove_path(&frame.path) {
                evicted += 1;
            }
            // Removed from the live set either way; a failed delete means
            // the artifact is already gone.
        }

        self.frames = kept;
        if evicted > 0 {
            debug!(evicted, retained = self.frames.len(), "evicted surplus frames");
        }
        Ok(evicted)
    }

    /// Number of live frames currently buffered.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether the buffer has reached the pre-trigger target.
    pub fn is_warmed(&self) -> bool {
        self.frames.len() >= self.pre_frames
    }

    /// The live frames, ordered by sequence number.
    pub fn frames(&self) -> &[StagedFrame] {
        &self.frames
    }

    /// Clone the current contents, ordered, for freezing into a window.
    pub fn snapshot(&self) -> Vec<StagedFrame> {
        self.frames.clone()
    }

    /// Forget all live frames (the staging area was swept for a re-arm).
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
