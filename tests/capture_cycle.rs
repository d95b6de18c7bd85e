//! Integration tests for the full capture cycle on mock hardware.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use trigcap::config::Settings;
use trigcap::controller::{Termination, TriggerController};
use trigcap::hardware::mock::{MockProducer, MockTrigger, MockViewer};
use trigcap::hardware::{FrameProducer, ViewerKey};
use trigcap::pressure::{CapacityProbe, MemoryPressureMonitor};

/// Helper to create a test configuration over temp directories.
fn test_settings(staging: &Path, output: &Path) -> Settings {
    let toml = format!(
        r#"
        [application]
        name = "trigcap test"

        [capture]
        frame_rate_fps = 500
        pre_frames = 5
        post_trigger = "50ms"
        frame_width = 8
        frame_height = 8
        tick = "2ms"

        [staging]
        dir = "{}"
        min_free_bytes = 1024

        [trigger]
        line = "/dev/null"

        [producer]
        start_retries = 50

        [storage]
        output_root = "{}"
        "#,
        staging.display(),
        output.display()
    );
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("trigcap.toml");
    std::fs::write(&path, toml).expect("write config");
    Settings::load_from(&path).expect("load settings")
}

struct FixedProbe(AtomicU64);

impl CapacityProbe for FixedProbe {
    fn free_bytes(&self) -> std::io::Result<u64> {
        Ok(self.0.load(Ordering::SeqCst))
    }
}

/// Timestamp micros-of-day parsed from a `cap_HHMMSS_uuuuuu.raw` name.
fn micros_of_day(name: &str) -> i64 {
    let stem = name
        .strip_prefix("cap_")
        .and_then(|s| s.strip_suffix(".raw"))
        .expect("finalized name");
    let (hms, us) = stem.split_at(6);
    let us: i64 = us[1..].parse().expect("micros");
    let h: i64 = hms[0..2].parse().expect("hour");
    let m: i64 = hms[2..4].parse().expect("minute");
    let s: i64 = hms[4..6].parse().expect("second");
    ((h * 3600 + m * 60 + s) * 1_000_000) + us
}

#[tokio::test]
async fn two_triggered_windows_then_terminate() {
    let staging = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let settings = test_settings(staging.path(), output.path());

    let producer = Arc::new(MockProducer::new(staging.path(), 500, 8, 8));
    let trigger = Arc::new(MockTrigger::new());
    let viewer = Arc::new(MockViewer::new([ViewerKey::Continue]));

    let controller = TriggerController::new(
        settings,
        producer.clone(),
        trigger.clone(),
        viewer.clone(),
    );
    let session = tokio::spawn(controller.run());

    // let the buffer warm, then hold the trigger asserted; being level-based
    // it fires the second window too, right after the re-arm warms
    sleep(Duration::from_millis(60)).await;
    trigger.assert_level();

    let report = session.await.expect("join").expect("run");
    assert_eq!(report.windows_persisted, 2);
    assert_eq!(report.termination, Termination::ViewerRequested);
    assert!(!producer.is_running().await);

    // both windows landed in today's bucket
    let date_key = chrono::Local::now().format("%y%m%d").to_string();
    let bucket = output.path().join(&date_key);
    let persisted: Vec<String> = std::fs::read_dir(&bucket)
        .expect("bucket exists")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    // each window carries at least its pre-trigger segment
    assert!(persisted.len() >= 10, "persisted {} artifacts", persisted.len());
    assert!(persisted.iter().all(|n| n.starts_with("cap_")));

    // nothing un-timestamped was left behind or persisted
    assert!(!persisted.iter().any(|n| n.starts_with("frame_")));
    let staged_leftovers = std::fs::read_dir(staging.path())
        .expect("staging")
        .filter(|e| {
            e.as_ref()
                .expect("entry")
                .file_name()
                .to_string_lossy()
                .starts_with("frame_")
        })
        .count();
    assert_eq!(staged_leftovers, 0);

    // the viewer saw one decoded reference frame per window
    let presented = viewer.presented().await;
    assert_eq!(presented.len(), 2);
    assert!(presented.iter().all(|p| p.pixel_count == 64));
}

#[tokio::test]
async fn pressure_mid_capture_still_finalizes_the_window() {
    let staging = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let mut settings = test_settings(staging.path(), output.path());
    // long capture so the pressure trip is what closes the window
    settings.capture.post_trigger = Duration::from_secs(30);

    let probe = Arc::new(FixedProbe(AtomicU64::new(u64::MAX)));
    let monitor = MemoryPressureMonitor::new(probe.clone(), settings.staging.min_free_bytes);
    let interval_us = settings.frame_interval_us();

    let producer = Arc::new(MockProducer::new(staging.path(), 500, 8, 8));
    let trigger = Arc::new(MockTrigger::new());
    let viewer = Arc::new(MockViewer::terminating());

    let controller = TriggerController::with_monitor(
        settings,
        producer.clone(),
        trigger.clone(),
        viewer.clone(),
        monitor,
    );
    let session = tokio::spawn(controller.run());

    sleep(Duration::from_millis(60)).await;
    trigger.assert_level();
    // let some post-trigger frames accumulate, then trip the floor
    sleep(Duration::from_millis(40)).await;
    probe.0.store(0, Ordering::SeqCst);

    let report = session.await.expect("join").expect("run");
    // the pre-trigger segment was not discarded: the window persisted
    assert_eq!(report.windows_persisted, 1);
    assert_eq!(report.termination, Termination::ViewerRequested);

    let date_key = chrono::Local::now().format("%y%m%d").to_string();
    let bucket = output.path().join(&date_key);
    let mut persisted: Vec<String> = std::fs::read_dir(&bucket)
        .expect("bucket exists")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert!(persisted.len() >= 5, "persisted {} artifacts", persisted.len());

    // reconstructed timestamps are spaced exactly one frame interval apart
    persisted.sort();
    for pair in persisted.windows(2) {
        let delta = micros_of_day(&pair[1]) - micros_of_day(&pair[0]);
        assert_eq!(delta, interval_us, "between {} and {}", pair[0], pair[1]);
    }
}
