//! `rpicam-raw` process producer.
//!
//! Spawns the camera pipeline as a child process writing segmented raw
//! frames straight into the staging directory, one file per frame, named by
//! the producer's own sequence counter.

use crate::config::Settings;
use crate::frame::{RAW_EXT, STAGED_PREFIX};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::info;

use super::capabilities::FrameProducer;

/// Producer backed by an external `rpicam-raw` process.
pub struct RpicamProducer {
    command: String,
    staging_dir: PathBuf,
    frame_rate_fps: u32,
    frame_width: u32,
    frame_height: u32,
    child: Mutex<Option<Child>>,
}

impl RpicamProducer {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            command: settings.producer.command.clone(),
            staging_dir: settings.staging.dir.clone(),
            frame_rate_fps: settings.capture.frame_rate_fps,
            frame_width: settings.capture.frame_width,
            frame_height: settings.capture.frame_height,
            child: Mutex::new(None),
        }
    }

    fn output_pattern(&self) -> PathBuf {
        self.staging_dir.join(format!("{STAGED_PREFIX}%06d{RAW_EXT}"))
    }
}

#[async_trait]
impl FrameProducer for RpicamProducer {
    async fn start(&self) -> Result<()> {
        let mut guard = self.child.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let output = self.output_pattern();
        let child = Command::new(&self.command)
            .arg("-n")
            .args(["-t", "0"])
            .args(["--segment", "1"])
            .args(["--framerate", &self.frame_rate_fps.to_string()])
            .args(["--width", &self.frame_width.to_string()])
            .args(["--height", &self.frame_height.to_string()])
            .arg("-o")
            .arg(&output)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn producer '{}'", self.command))?;

        info!(
            command = %self.command,
            fps = self.frame_rate_fps,
            output = %output.display(),
            "producer started"
        );
        *guard = Some(child);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            child
                .start_kill()
                .context("failed to signal producer process")?;
            child
                .wait()
                .await
                .context("failed to reap producer process")?;
            info!("producer stopped");
        }
        Ok(())
    }

    async fn is_running(&self) -> bool {
        let mut guard = self.child.lock().await;
        match guard.as_mut() {
            // try_wait returns None while the process is still alive
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn producer_with(command: &str, staging: &std::path::Path) -> RpicamProducer {
        let toml = format!(
            r#"
            [application]
            name = "trigcap"

            [capture]
            frame_rate_fps = 200
            pre_frames = 10
            frame_width = 640
            frame_height = 480

            [staging]
            dir = "{}"
            min_free_bytes = 1048576

            [trigger]
            line = "/dev/null"

            [producer]
            command = "{}"

            [storage]
            output_root = "/tmp/out"
            "#,
            staging.display(),
            command
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, toml).expect("write config");
        let settings = Settings::load_from(&path).expect("load settings");
        RpicamProducer::from_settings(&settings)
    }

    #[tokio::test]
    async fn stop_without_start_is_noop() {
        let staging = tempfile::tempdir().expect("tempdir");
        let producer = producer_with("rpicam-raw", staging.path());
        assert!(!producer.is_running().await);
        producer.stop().await.expect("stop");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn start_stop_lifecycle_with_stub_command() {
        use std::os::unix::fs::PermissionsExt;

        let staging = tempfile::tempdir().expect("tempdir");
        // a long-sleeping stub stands in for the camera pipeline
        let stub = staging.path().join("fake-rpicam");
        std::fs::write(&stub, "#!/bin/sh\nsleep 60\n").expect("write stub");
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755))
            .expect("chmod stub");

        let producer = producer_with(&stub.display().to_string(), staging.path());

        producer.start().await.expect("start");
        assert!(producer.is_running().await);
        producer.stop().await.expect("stop");
        assert!(!producer.is_running().await);
    }

    #[tokio::test]
    async fn start_with_missing_binary_fails() {
        let staging = tempfile::tempdir().expect("tempdir");
        let producer = producer_with("definitely-not-a-binary-xyz", staging.path());
        assert!(producer.start().await.is_err());
    }
}
