//! GPIO line trigger input.
//!
//! Reads the trigger level from a GPIO line value file (sysfs-style: the
//! file holds `"1"` while the line is asserted). The read happens once per
//! control tick, which bounds trigger latency at the tick interval.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use super::capabilities::TriggerInput;

/// Level-based trigger read from a GPIO line value file.
pub struct GpioLineTrigger {
    line: PathBuf,
}

impl GpioLineTrigger {
    pub fn new(line: impl Into<PathBuf>) -> Self {
        Self { line: line.into() }
    }
}

#[async_trait]
impl TriggerInput for GpioLineTrigger {
    async fn is_asserted(&self) -> Result<bool> {
        let value = tokio::fs::read_to_string(&self.line)
            .await
            .with_context(|| format!("failed to read trigger line {}", self.line.display()))?;
        Ok(value.trim() == "1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_asserted_and_released_levels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let line = dir.path().join("gpio21_value");

        std::fs::write(&line, "0\n").expect("write");
        let trigger = GpioLineTrigger::new(&line);
        assert!(!trigger.is_asserted().await.expect("read"));

        std::fs::write(&line, "1\n").expect("write");
        assert!(trigger.is_asserted().await.expect("read"));
    }

    #[tokio::test]
    async fn missing_line_is_an_error() {
        let trigger = GpioLineTrigger::new("/definitely/not/a/gpio/line");
        assert!(trigger.is_asserted().await.is_err());
    }
}
