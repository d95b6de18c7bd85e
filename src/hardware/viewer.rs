//! Headless viewer.
//!
//! On a deployed trap there is usually no display attached. The headless
//! viewer logs the reference frame's identity and immediately returns a
//! configured key: `Continue` keeps the trap re-arming after every capture,
//! `Terminate` makes each capture a one-shot run.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::capabilities::{FrameViewer, ViewerKey};

/// Viewer that logs instead of displaying and answers with a fixed key.
pub struct HeadlessViewer {
    key: ViewerKey,
}

impl HeadlessViewer {
    /// Headless viewer that re-arms after every capture.
    pub fn new() -> Self {
        Self {
            key: ViewerKey::Continue,
        }
    }

    /// Headless viewer that terminates after the first capture.
    pub fn one_shot() -> Self {
        Self {
            key: ViewerKey::Terminate,
        }
    }
}

impl Default for HeadlessViewer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameViewer for HeadlessViewer {
    async fn present(
        &self,
        label: &str,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<ViewerKey> {
        info!(
            reference = label,
            width,
            height,
            bytes = pixels.len(),
            "reference frame ready (headless, no display)"
        );
        Ok(self.key)
    }
}
