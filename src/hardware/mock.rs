//! Mock hardware implementations.
//!
//! Simulated collaborators for testing the capture loop without a camera, a
//! GPIO line or a display. All mocks use async-safe operations
//! (tokio::time::sleep, not std::thread::sleep).
//!
//! - `MockProducer` - tokio task writing synthetic packed frames at the
//!   configured rate
//! - `MockTrigger` - shared flag a test flips to fire the trigger
//! - `MockViewer` - scripted key responses, records what it was shown

use anyhow::Result;
use async_trait::async_trait;
use rand::RngCore;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use super::capabilities::{FrameProducer, FrameViewer, TriggerInput, ViewerKey};
use crate::frame::staged_name;

/// Mock producer writing synthetic 10-bit-packed frames.
///
/// Starts a tokio task that writes `frame_NNNNNN.raw` files into the staging
/// directory at the configured rate, numbering from zero on every start,
/// like the real camera pipeline.
pub struct MockProducer {
    staging_dir: PathBuf,
    interval: Duration,
    packed_bytes: usize,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MockProducer {
    pub fn new(staging_dir: impl Into<PathBuf>, frame_rate_fps: u32, width: u32, height: u32) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            interval: Duration::from_micros(1_000_000 / u64::from(frame_rate_fps)),
            packed_bytes: (width as usize * height as usize) * 5 / 4,
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }
}

#[async_trait]
impl FrameProducer for MockProducer {
    async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let dir = self.staging_dir.clone();
        let interval = self.interval;
        let packed_bytes = self.packed_bytes;

        *task = Some(tokio::spawn(async move {
            let mut rng = rand::rngs::OsRng;
            let mut seq = 0u64;
            let mut payload = vec![0u8; packed_bytes];
            while running.load(Ordering::SeqCst) {
                rng.fill_bytes(&mut payload);
                if tokio::fs::write(dir.join(staged_name(seq)), &payload)
                    .await
                    .is_err()
                {
                    break;
                }
                seq += 1;
                sleep(interval).await;
            }
        }));
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.lock().await.take() {
            let _ = task.await;
        }
        Ok(())
    }

    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.task.lock().await.is_some()
    }
}

/// Trigger mock driven by a shared flag.
#[derive(Clone, Default)]
pub struct MockTrigger {
    asserted: Arc<AtomicBool>,
}

impl MockTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert the trigger level (stays asserted until released).
    pub fn assert_level(&self) {
        self.asserted.store(true, Ordering::SeqCst);
    }

    /// Release the trigger level.
    pub fn release(&self) {
        self.asserted.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl TriggerInput for MockTrigger {
    async fn is_asserted(&self) -> Result<bool> {
        Ok(self.asserted.load(Ordering::SeqCst))
    }
}

/// Record of one frame shown to the mock viewer.
#[derive(Debug, Clone)]
pub struct PresentedFrame {
    pub label: String,
    pub pixel_count: usize,
    pub width: u32,
    pub height: u32,
}

/// Viewer mock with scripted key responses.
///
/// Returns the scripted keys in order; once the script is exhausted it
/// answers `Terminate` so a test session always winds down.
pub struct MockViewer {
    keys: Mutex<VecDeque<ViewerKey>>,
    presented: Mutex<Vec<PresentedFrame>>,
}

impl MockViewer {
    pub fn new(keys: impl IntoIterator<Item = ViewerKey>) -> Self {
        Self {
            keys: Mutex::new(keys.into_iter().collect()),
            presented: Mutex::new(Vec::new()),
        }
    }

    /// Viewer that terminates at the first presentation.
    pub fn terminating() -> Self {
        Self::new([])
    }

    /// Frames presented so far.
    pub async fn presented(&self) -> Vec<PresentedFrame> {
        self.presented.lock().await.clone()
    }
}

#[async_trait]
impl FrameViewer for MockViewer {
    async fn present(
        &self,
        label: &str,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<ViewerKey> {
        self.presented.lock().await.push(PresentedFrame {
            label: label.to_string(),
            pixel_count: pixels.len(),
            width,
            height,
        });
        Ok(self
            .keys
            .lock()
            .await
            .pop_front()
            .unwrap_or(ViewerKey::Terminate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_producer_writes_sequence_ordered_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        let producer = MockProducer::new(dir.path(), 1000, 8, 8);

        producer.start().await.expect("start");
        assert!(producer.is_running().await);
        sleep(Duration::from_millis(50)).await;
        producer.stop().await.expect("stop");
        assert!(!producer.is_running().await);

        let store = crate::store::FrameStore::new(dir.path());
        let frames = store.scan_staged().expect("scan");
        assert!(frames.len() > 5, "expected several frames, got {}", frames.len());
        assert_eq!(frames[0].seq, 0);
        // packed payload size for 8x8
        let len = std::fs::metadata(&frames[0].path).expect("meta").len();
        assert_eq!(len, 80);
    }

    #[tokio::test]
    async fn mock_trigger_levels() {
        let trigger = MockTrigger::new();
        assert!(!trigger.is_asserted().await.expect("read"));
        trigger.assert_level();
        assert!(trigger.is_asserted().await.expect("read"));
        trigger.release();
        assert!(!trigger.is_asserted().await.expect("read"));
    }

    #[tokio::test]
    async fn mock_viewer_plays_script_then_terminates() {
        let viewer = MockViewer::new([ViewerKey::Continue]);
        let pixels = vec![0u8; 4];
        assert_eq!(
            viewer.present("a", &pixels, 2, 2).await.expect("present"),
            ViewerKey::Continue
        );
        assert_eq!(
            viewer.present("b", &pixels, 2, 2).await.expect("present"),
            ViewerKey::Terminate
        );
        assert_eq!(viewer.presented().await.len(), 2);
    }
}
