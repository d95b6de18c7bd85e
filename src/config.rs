//! Configuration loading for the capture engine.
//!
//! This module provides strongly-typed configuration using Figment.
//! Configuration is loaded from:
//! 1. A TOML file (base configuration, see `config/trigcap.toml`)
//! 2. Environment variables (prefixed with TRIGCAP_)
//!
//! The frame interval is derived here, in exactly one place
//! ([`Settings::frame_interval_us`]), because the retention policy and the
//! timestamp reconstruction must agree on it or retention and timestamps
//! drift apart.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Application-level settings
    pub application: ApplicationConfig,
    /// Capture window geometry and timing
    pub capture: CaptureConfig,
    /// Transient staging area settings
    pub staging: StagingConfig,
    /// Trigger input settings
    pub trigger: TriggerConfig,
    /// External frame producer settings
    #[serde(default)]
    pub producer: ProducerConfig,
    /// Durable storage settings
    pub storage: StorageConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Logging output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Capture window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Producer frame rate in frames per second
    pub frame_rate_fps: u32,
    /// Minimum number of pre-trigger frames retained in the ring buffer
    pub pre_frames: usize,
    /// Post-trigger capture duration
    #[serde(with = "humantime_serde", default = "default_post_trigger")]
    pub post_trigger: Duration,
    /// Frame width in pixels
    pub frame_width: u32,
    /// Frame height in pixels
    pub frame_height: u32,
    /// Control loop tick interval
    #[serde(with = "humantime_serde", default = "default_tick")]
    pub tick: Duration,
}

/// Transient staging area configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Directory the producer writes staged frames into (typically tmpfs)
    pub dir: PathBuf,
    /// Free-capacity floor in bytes; capture stops below this
    pub min_free_bytes: u64,
}

/// Trigger input configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Identifier of the trigger input (path of a GPIO line value file)
    pub line: PathBuf,
}

/// External frame producer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Producer executable
    #[serde(default = "default_producer_command")]
    pub command: String,
    /// Readiness polls before giving up on a producer start
    #[serde(default = "default_start_retries")]
    pub start_retries: u32,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            command: default_producer_command(),
            start_retries: default_start_retries(),
        }
    }
}

/// Durable storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the durable storage tree; windows land in dated subdirectories
    pub output_root: PathBuf,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_post_trigger() -> Duration {
    Duration::from_secs(10)
}

fn default_tick() -> Duration {
    Duration::from_millis(1)
}

fn default_producer_command() -> String {
    "rpicam-raw".to_string()
}

fn default_start_retries() -> u32 {
    200
}

impl Settings {
    /// Load configuration from config/trigcap.toml and environment variables.
    ///
    /// Environment variables can override configuration with prefix TRIGCAP_.
    /// Example: TRIGCAP_APPLICATION_LOG_LEVEL=debug
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from("config/trigcap.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("TRIGCAP_").split("_"))
            .extract()
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.as_str()) {
            return Err(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            ));
        }

        if self.capture.frame_rate_fps == 0 {
            return Err("frame_rate_fps must be greater than 0".to_string());
        }

        if self.capture.pre_frames == 0 {
            return Err("pre_frames must be greater than 0".to_string());
        }

        if self.capture.post_trigger.is_zero() {
            return Err("post_trigger duration must be non-zero".to_string());
        }

        if self.capture.frame_width == 0 || self.capture.frame_height == 0 {
            return Err("frame geometry must be non-zero".to_string());
        }

        // Staged artifacts are 10-bit packed: 4 pixels per 5-byte group.
        if (self.capture.frame_width as u64 * self.capture.frame_height as u64) % 4 != 0 {
            return Err(format!(
                "frame geometry {}x{} is not packable into 5-byte groups of 4 pixels",
                self.capture.frame_width, self.capture.frame_height
            ));
        }

        if self.staging.min_free_bytes == 0 {
            return Err("min_free_bytes must be greater than 0".to_string());
        }

        if self.producer.start_retries == 0 {
            return Err("producer start_retries must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Fixed interval between consecutive frames, in microseconds.
    ///
    /// Shared by retention pacing and timestamp reconstruction.
    pub fn frame_interval_us(&self) -> i64 {
        1_000_000 / i64::from(self.capture.frame_rate_fps)
    }

    /// Expected byte count of one staged 10-bit-packed frame.
    pub fn packed_frame_bytes(&self) -> u64 {
        self.capture.frame_width as u64 * self.capture.frame_height as u64 * 5 / 4
    }
}
