//! Capture phase state machine.
//!
//! `TriggerController` drives one capture session through its phases:
//!
//! ```text
//! WARMUP -> ARMED -> CAPTURING -> FINALIZING -> (WARMUP | TERMINATED)
//! ```
//!
//! - **WARMUP**: the producer has just (re)started; admit frames until the
//!   ring buffer holds the pre-trigger target.
//! - **ARMED**: steady state; admit, evict surplus, watch pressure, poll the
//!   trigger. Pressure trips to TERMINATED; a trigger freezes the window.
//! - **CAPTURING**: keep admitting post-trigger frames until the capture
//!   duration elapses or pressure trips, then stop the producer and drain.
//! - **FINALIZING**: reconstruct per-frame timestamps, rename, persist to
//!   the dated bucket, purge leftovers, show the reference frame. The
//!   viewer's key decides between re-arming and termination.
//!
//! The window is frozen at the *instant* of trigger detection: the buffer
//! contents and the reference position are recorded before anything else
//! happens, so the pre-trigger count is exactly what was buffered when the
//! signal fired, however fast or slow subsequent ticks run.

use crate::clock::{Reconstructor, WallClock};
use crate::config::Settings;
use crate::error::{AppResult, CaptureError};
use crate::frame::{self, StagedFrame};
use crate::hardware::{FrameProducer, FrameViewer, TriggerInput, ViewerKey};
use crate::persist::PersistenceCoordinator;
use crate::pressure::MemoryPressureMonitor;
use crate::ring::RingBufferManager;
use crate::store::FrameStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// One frozen trigger window, from freeze to finalize.
#[derive(Debug)]
pub struct TriggerWindow {
    /// Window members, ordered by sequence number. Holds the pre-trigger
    /// segment at freeze time; the post-trigger segment is appended while
    /// CAPTURING.
    pub frames: Vec<StagedFrame>,
    /// Position of the reference frame: the buffer size at the moment of
    /// trigger detection, so the first frame captured after the trigger
    /// fired carries the trigger's observed wall-clock time.
    pub reference_pos: usize,
    /// Wall-clock time observed at trigger detection.
    pub trigger_time: WallClock,
    /// 6-digit date bucket key derived from the trigger's date.
    pub date_key: String,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The viewer answered with the terminate key.
    ViewerRequested,
    /// Free capacity fell below the configured floor.
    MemoryPressure,
}

/// Summary of a finished session.
#[derive(Debug, Clone, Copy)]
pub struct SessionReport {
    /// Trigger windows finalized and persisted.
    pub windows_persisted: usize,
    pub termination: Termination,
}

enum CapturePhase {
    Warmup,
    Armed,
    Capturing {
        window: TriggerWindow,
        deadline: Instant,
    },
    Finalizing {
        window: TriggerWindow,
    },
    Terminated {
        reason: Termination,
    },
}

/// Drives a capture session; owns the producer for the session's lifetime.
pub struct TriggerController {
    settings: Settings,
    store: FrameStore,
    ring: RingBufferManager,
    monitor: MemoryPressureMonitor,
    persist: PersistenceCoordinator,
    producer: Arc<dyn FrameProducer>,
    trigger: Arc<dyn TriggerInput>,
    viewer: Arc<dyn FrameViewer>,
    windows_persisted: usize,
}

impl TriggerController {
    /// Controller with the staging filesystem itself as the capacity probe.
    pub fn new(
        settings: Settings,
        producer: Arc<dyn FrameProducer>,
        trigger: Arc<dyn TriggerInput>,
        viewer: Arc<dyn FrameViewer>,
    ) -> Self {
        let store = FrameStore::new(&settings.staging.dir);
        let monitor =
            MemoryPressureMonitor::new(Arc::new(store.clone()), settings.staging.min_free_bytes);
        Self::with_monitor(settings, producer, trigger, viewer, monitor)
    }

    /// Controller with an injected pressure monitor (tests script capacity).
    pub fn with_monitor(
        settings: Settings,
        producer: Arc<dyn FrameProducer>,
        trigger: Arc<dyn TriggerInput>,
        viewer: Arc<dyn FrameViewer>,
        monitor: MemoryPressureMonitor,
    ) -> Self {
        let store = FrameStore::new(&settings.staging.dir);
        let ring = RingBufferManager::new(store.clone(), settings.capture.pre_frames);
        let persist = PersistenceCoordinator::new(&settings.storage.output_root);
        Self {
            settings,
            store,
            ring,
            monitor,
            persist,
            producer,
            trigger,
            viewer,
            windows_persisted: 0,
        }
    }

    /// Run the session to termination.
    pub async fn run(mut self) -> AppResult<SessionReport> {
        let swept = self.store.sweep()?;
        if swept > 0 {
            info!(swept, "cleared stale artifacts from staging");
        }

        self.start_producer().await?;
        info!("capturing pre-trigger frames");

        let mut phase = CapturePhase::Warmup;
        let reason = loop {
            phase = match phase {
                CapturePhase::Warmup => self.warmup_tick().await?,
                CapturePhase::Armed => self.armed_tick().await?,
                CapturePhase::Capturing { window, deadline } => {
                    self.capturing_tick(window, deadline).await?
                }
                CapturePhase::Finalizing { window } => self.finalize(window).await?,
                CapturePhase::Terminated { reason } => break reason,
            };
        };

        Ok(SessionReport {
            windows_persisted: self.windows_persisted,
            termination: reason,
        })
    }

    async fn warmup_tick(&mut self) -> AppResult<CapturePhase> {
        self.ring.admit()?;
        if self.ring.is_warmed() {
            info!(buffered = self.ring.len(), "pre-trigger buffer warmed; armed");
            return Ok(CapturePhase::Armed);
        }
        if self.monitor.must_stop() {
            warn!(
                floor = self.monitor.floor_bytes(),
                "free capacity below floor during warm-up; shutting down"
            );
            self.stop_producer().await?;
            return Ok(CapturePhase::Terminated {
                reason: Termination::MemoryPressure,
            });
        }
        sleep(self.settings.capture.tick).await;
        Ok(CapturePhase::Warmup)
    }

    async fn armed_tick(&mut self) -> AppResult<CapturePhase> {
        self.ring.admit()?;
        self.ring.evict_excess(&HashSet::new())?;

        if self.monitor.must_stop() {
            warn!(
                floor = self.monitor.floor_bytes(),
                "free capacity below floor while armed; shutting down"
            );
            self.stop_producer().await?;
            return Ok(CapturePhase::Terminated {
                reason: Termination::MemoryPressure,
            });
        }

        let asserted = self
            .trigger
            .is_asserted()
            .await
            .map_err(|e| CaptureError::Trigger(e.to_string()))?;
        if asserted {
            // Freeze the window before anything else happens this tick.
            let now = chrono::Local::now();
            let trigger_time = WallClock::from_naive_time(now.time());
            let date_key = now.format("%y%m%d").to_string();
            let frames = self.ring.snapshot();
            let reference_pos = frames.len();
            info!(
                trigger = %trigger_time,
                pre_frames = frames.len(),
                "triggered; capturing post-trigger frames"
            );
            let window = TriggerWindow {
                frames,
                reference_pos,
                trigger_time,
                date_key,
            };
            return Ok(CapturePhase::Capturing {
                window,
                deadline: Instant::now() + self.settings.capture.post_trigger,
            });
        }

        sleep(self.settings.capture.tick).await;
        Ok(CapturePhase::Armed)
    }

    async fn capturing_tick(
        &mut self,
        mut window: TriggerWindow,
        deadline: Instant,
    ) -> AppResult<CapturePhase> {
        self.ring.admit()?;

        let pressure = self.monitor.must_stop();
        if pressure {
            warn!("free capacity below floor during capture; closing window early");
        }
        if pressure || Instant::now() >= deadline {
            self.stop_producer().await?;
            // Drain frames the producer wrote before the stop landed. No
            // eviction has run since the freeze, so the ring holds the full
            // ordered window: the frozen pre segment plus everything since.
            self.ring.admit()?;
            window.frames = self.ring.snapshot();
            info!(total = window.frames.len(), "capture window closed");
            return Ok(CapturePhase::Finalizing { window });
        }

        sleep(self.settings.capture.tick).await;
        Ok(CapturePhase::Capturing { window, deadline })
    }

    async fn finalize(&mut self, window: TriggerWindow) -> AppResult<CapturePhase> {
        let recon = Reconstructor::new(
            window.trigger_time,
            window.reference_pos,
            self.settings.frame_interval_us(),
        );

        // The reference frame is the one at reference_pos; if the window
        // closed before any post-trigger frame arrived, show the newest
        // frame instead (timestamps stay anchored at the true reference).
        let display_pos = window.reference_pos.min(window.frames.len().saturating_sub(1));
        let mut reference_name = String::new();
        for (pos, member) in window.frames.iter().enumerate() {
            let name = frame::finalized_name(&recon.timestamp_at(pos).to_string());
            if !self.store.rename_if_present(&member.path, &name)? {
                warn!(seq = member.seq, "window frame vanished before finalize");
            }
            if pos == display_pos {
                reference_name = name;
            }
        }
        if display_pos != window.reference_pos {
            warn!("no post-trigger frames captured; presenting the newest pre-trigger frame");
        }

        self.persist.persist_window(&self.store, &window.date_key)?;
        self.windows_persisted += 1;

        // Persist before purge: window artifacts are cap_-named and already
        // moved, so the purge can only touch frames that never made a window.
        let purged = self.purge_staged()?;
        if purged > 0 {
            debug!(purged, "purged staged frames outside the window");
        }

        let key = self.present_reference(&window, &reference_name).await?;
        match key {
            ViewerKey::Terminate => {
                self.stop_producer().await?;
                info!("terminate requested; session ending");
                Ok(CapturePhase::Terminated {
                    reason: Termination::ViewerRequested,
                })
            }
            ViewerKey::Continue => {
                self.store.sweep()?;
                self.ring.clear();
                self.start_producer().await?;
                info!("re-armed; capturing pre-trigger frames");
                Ok(CapturePhase::Warmup)
            }
        }
    }

    /// Decode the persisted reference frame and show it to the viewer.
    async fn present_reference(
        &self,
        window: &TriggerWindow,
        reference_name: &str,
    ) -> AppResult<ViewerKey> {
        let path = self.persist.bucket_dir(&window.date_key).join(reference_name);
        let bytes = tokio::fs::read(&path).await?;
        let width = self.settings.capture.frame_width;
        let height = self.settings.capture.frame_height;
        let pixels = frame::unpack_packed10(&bytes, width, height)?;
        self.viewer
            .present(reference_name, &pixels, width, height)
            .await
            .map_err(|e| CaptureError::Viewer(e.to_string()))
    }

    /// Delete staged artifacts left over after persistence.
    fn purge_staged(&self) -> AppResult<usize> {
        let mut purged = 0;
        for leftover in self.store.scan_staged()? {
            if self.store.remove_path(&leftover.path) {
                purged += 1;
            }
        }
        Ok(purged)
    }

    async fn start_producer(&self) -> AppResult<()> {
        self.producer
            .start()
            .await
            .map_err(|e| CaptureError::Producer(e.to_string()))?;
        self.await_producer_ready().await
    }

    /// Poll the producer up to the configured retry bound.
    async fn await_producer_ready(&self) -> AppResult<()> {
        let retries = self.settings.producer.start_retries;
        for _ in 0..retries {
            if self.producer.is_running().await {
                return Ok(());
            }
            sleep(self.settings.capture.tick).await;
        }
        Err(CaptureError::ProducerNotReady(retries))
    }

    async fn stop_producer(&self) -> AppResult<()> {
        self.producer
            .stop()
            .await
            .map_err(|e| CaptureError::Producer(e.to_string()))
    }
}
