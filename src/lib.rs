//! # trigcap Core Library
//!
//! This crate is the core of `trigcap`, a triggered ring-buffer frame
//! capture engine for continuous-acquisition cameras. An external producer
//! streams raw frames at a fixed rate into a ram-backed staging area; the
//! engine keeps the newest frames alive in a ring buffer, and a hardware
//! trigger freezes a window of pre-trigger frames plus a configured duration
//! of post-trigger frames. The window is given exact per-frame wall-clock
//! timestamps reconstructed from the trigger instant and moved to durable,
//! date-bucketed storage.
//!
//! ## Crate Structure
//!
//! - **`clock`**: wall-clock timestamp reconstruction by signed frame offset,
//!   with carry/borrow across second/minute/hour fields and 24-hour wrap.
//! - **`config`**: strongly-typed configuration loaded from TOML and
//!   environment variables. See `config::Settings`.
//! - **`controller`**: the capture phase state machine
//!   (WARMUP/ARMED/CAPTURING/FINALIZING/TERMINATED) driving a session.
//! - **`error`**: the `CaptureError` enum for centralized error handling.
//! - **`frame`**: staged/finalized artifact naming and raw payload handling.
//! - **`hardware`**: capability traits for the external collaborators
//!   (producer, trigger, viewer) plus real and mock implementations.
//! - **`persist`**: idempotent, date-bucketed persistence of finalized
//!   windows.
//! - **`pressure`**: free-capacity monitoring against a configured floor.
//! - **`ring`**: live frame retention and eviction.
//! - **`store`**: the staging-directory abstraction.
//! - **`telemetry`**: structured logging infrastructure.

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod hardware;
pub mod persist;
pub mod pressure;
pub mod ring;
pub mod store;
pub mod telemetry;
