//! Custom error types for the application.
//!
//! This module defines the primary error type, `CaptureError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different failure classes a capture session
//! can hit, from configuration problems to producer lifecycle failures.
//!
//! Two classes deliberately do NOT appear here because they are not errors:
//!
//! - A staged artifact that vanishes between enumeration and deletion lost a
//!   race with a previous eviction pass. The operation is skipped and logged.
//! - Free capacity dropping below the configured floor forces an orderly
//!   phase transition in the controller, never an error return.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, CaptureError>;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Producer error: {0}")]
    Producer(String),

    #[error("Producer not running after {0} readiness polls")]
    ProducerNotReady(u32),

    #[error("Trigger input error: {0}")]
    Trigger(String),

    #[error("Viewer error: {0}")]
    Viewer(String),

    #[error("Malformed reference frame: expected {expected} bytes for configured geometry, found {actual}")]
    MalformedFrame { expected: u64, actual: u64 },

    #[error("Staged frame name '{0}' does not match the producer naming scheme")]
    UnrecognizedFrameName(String),
}
