//! CLI entry point for trigcap.
//!
//! # Usage
//!
//! Run a capture session:
//! ```bash
//! trigcap run --config config/trigcap.toml
//! ```
//!
//! Validate a configuration file without touching hardware:
//! ```bash
//! trigcap check-config --config config/trigcap.toml
//! ```

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trigcap::config::Settings;
use trigcap::controller::TriggerController;
use trigcap::hardware::gpio::GpioLineTrigger;
use trigcap::hardware::rpicam::RpicamProducer;
use trigcap::hardware::viewer::HeadlessViewer;
use trigcap::telemetry;

#[derive(Parser)]
#[command(name = "trigcap")]
#[command(about = "Triggered ring-buffer frame capture engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a capture session until terminated
    Run {
        /// Path to the configuration file
        #[arg(long, default_value = "config/trigcap.toml")]
        config: PathBuf,

        /// Terminate after the first captured window instead of re-arming
        #[arg(long)]
        one_shot: bool,
    },

    /// Load and validate a configuration file, then exit
    CheckConfig {
        /// Path to the configuration file
        #[arg(long, default_value = "config/trigcap.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, one_shot } => run_session(config, one_shot).await,
        Commands::CheckConfig { config } => check_config(config),
    }
}

async fn run_session(config_path: PathBuf, one_shot: bool) -> Result<()> {
    let settings = load_settings(&config_path)?;
    telemetry::init_from_config(&settings).map_err(|e| anyhow!(e))?;

    tracing::info!(
        config = %config_path.display(),
        staging = %settings.staging.dir.display(),
        fps = settings.capture.frame_rate_fps,
        pre_frames = settings.capture.pre_frames,
        "starting capture session"
    );

    let producer = Arc::new(RpicamProducer::from_settings(&settings));
    let trigger = Arc::new(GpioLineTrigger::new(&settings.trigger.line));
    let viewer = if one_shot {
        Arc::new(HeadlessViewer::one_shot())
    } else {
        Arc::new(HeadlessViewer::new())
    };

    let controller = TriggerController::new(settings, producer, trigger, viewer);
    let report = controller.run().await?;

    tracing::info!(
        windows = report.windows_persisted,
        termination = ?report.termination,
        "session finished"
    );
    Ok(())
}

fn check_config(config_path: PathBuf) -> Result<()> {
    let settings = load_settings(&config_path)?;
    println!(
        "{}: ok ({} fps, {} pre-trigger frames, {:?} post-trigger)",
        config_path.display(),
        settings.capture.frame_rate_fps,
        settings.capture.pre_frames,
        settings.capture.post_trigger
    );
    Ok(())
}

fn load_settings(path: &Path) -> Result<Settings> {
    let settings = Settings::load_from(path)?;
    settings
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {e}"))?;
    Ok(settings)
}
