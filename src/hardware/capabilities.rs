//! Capability traits for the external collaborators.
//!
//! Each trait covers exactly one seam of the capture loop and is implemented
//! both by the real hardware binding and by a mock. All traits are async,
//! thread-safe (`Send + Sync`, `&self` with interior mutability) and use
//! `anyhow::Result` at the boundary; the controller converts failures into
//! its own error type.

use anyhow::Result;
use async_trait::async_trait;

/// Capability: external frame producer.
///
/// A process (or simulated task) that writes sequence-numbered staged frames
/// into the staging directory at a fixed rate.
///
/// # Contract
/// - `start()` launches the producer with the session's rate and geometry;
///   frames may not appear immediately, poll `is_running()`.
/// - `stop()` commands the producer to halt and waits for it; idempotent,
///   stopping an already-stopped producer is a no-op.
/// - After `stop()` returns, no further staged frames will appear, so the
///   staging directory contents are final.
#[async_trait]
pub trait FrameProducer: Send + Sync {
    /// Launch the producer.
    async fn start(&self) -> Result<()>;

    /// Stop the producer and wait for it to exit.
    async fn stop(&self) -> Result<()>;

    /// Whether the producer is currently running.
    async fn is_running(&self) -> bool;
}

/// Capability: external trigger input.
///
/// Level-based, not edge-triggered: the signal reads true for as long as it
/// is asserted. The controller's own phase transition out of ARMED is what
/// prevents re-triggering mid-capture.
#[async_trait]
pub trait TriggerInput: Send + Sync {
    /// Current level of the trigger signal.
    async fn is_asserted(&self) -> Result<bool>;
}

/// Single discrete response from the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKey {
    /// Re-arm for another capture.
    Continue,
    /// Shut the session down.
    Terminate,
}

/// Capability: frame viewer.
///
/// Displays one decoded frame and blocks until a single key response. This
/// is the one blocking call in the control loop, made only while the
/// producer is stopped.
#[async_trait]
pub trait FrameViewer: Send + Sync {
    /// Present a decoded 8-bit frame and wait for the operator's response.
    async fn present(&self, label: &str, pixels: &[u8], width: u32, height: u32)
        -> Result<ViewerKey>;
}
