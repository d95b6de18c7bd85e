//! Staged frame naming and raw payload handling.
//!
//! The external producer writes frames into the staging directory as
//! `frame_NNNNNN.raw`, where the 6-digit sequence number increases
//! monotonically for the life of one producer run. At finalization each
//! window member is renamed in place to `cap_HHMMSS_uuuuuu.raw`, carrying its
//! reconstructed capture time; only `cap_`-named artifacts are ever moved to
//! durable storage.
//!
//! Staged payloads are 10-bit packed sensor data: every 5-byte group holds
//! the high 8 bits of 4 pixels followed by one byte of packed low bits. The
//! viewer path keeps the high bytes and drops the 5th.

use crate::error::{AppResult, CaptureError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::path::PathBuf;

/// Prefix of producer-written staged artifacts.
pub const STAGED_PREFIX: &str = "frame_";
/// Prefix of finalized, timestamp-named artifacts.
pub const FINAL_PREFIX: &str = "cap_";
/// Raw artifact extension.
pub const RAW_EXT: &str = ".raw";

// %06d zero-pads to 6 digits but keeps growing past a million frames
static STAGED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^frame_(\d{6,})\.raw$").expect("staged name pattern"));
static FINAL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^cap_\d{6}_\d{6}\.raw$").expect("final name pattern"));

/// One live frame artifact in the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFrame {
    /// Producer-assigned sequence number, parsed from the file name.
    pub seq: u64,
    /// Absolute path of the staged artifact.
    pub path: PathBuf,
}

impl PartialOrd for StagedFrame {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StagedFrame {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seq.cmp(&other.seq)
    }
}

/// Parse a staged file name into its sequence number.
///
/// Returns `None` for anything that does not match the producer naming
/// scheme, so stray files in the staging directory are ignored rather than
/// admitted.
pub fn parse_staged_name(name: &str) -> Option<u64> {
    let captures = STAGED_NAME.captures(name)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Staged file name for a sequence number (used by the mock producer).
pub fn staged_name(seq: u64) -> String {
    format!("{STAGED_PREFIX}{seq:06}{RAW_EXT}")
}

/// Finalized file name for a reconstructed timestamp string.
pub fn finalized_name(timestamp: &str) -> String {
    format!("{FINAL_PREFIX}{timestamp}{RAW_EXT}")
}

/// Whether a file name carries the finalized, timestamped naming.
pub fn is_finalized_name(name: &str) -> bool {
    FINAL_NAME.is_match(name)
}

/// Unpack a 10-bit packed payload to one byte per pixel.
///
/// Keeps the 4 high bytes of every 5-byte group and drops the packed
/// low-bits byte. The stored byte count must match the configured geometry
/// exactly; a mismatch means the artifact was truncated or the geometry is
/// wrong, and the decoded frame would be garbage.
pub fn unpack_packed10(data: &[u8], width: u32, height: u32) -> AppResult<Vec<u8>> {
    let expected = width as u64 * height as u64 * 5 / 4;
    if data.len() as u64 != expected {
        return Err(CaptureError::MalformedFrame {
            expected,
            actual: data.len() as u64,
        });
    }

    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for group in data.chunks_exact(5) {
        pixels.extend_from_slice(&group[..4]);
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_staged_names() {
        assert_eq!(parse_staged_name("frame_000042.raw"), Some(42));
        assert_eq!(parse_staged_name("frame_999999.raw"), Some(999_999));
        // the producer's counter keeps growing past six digits
        assert_eq!(parse_staged_name("frame_1000001.raw"), Some(1_000_001));
    }

    #[test]
    fn rejects_foreign_names() {
        assert_eq!(parse_staged_name("frame_42.raw"), None);
        assert_eq!(parse_staged_name("frame_000042.jpg"), None);
        assert_eq!(parse_staged_name("cap_120000_000000.raw"), None);
        assert_eq!(parse_staged_name("frame_000042.raw.tmp"), None);
    }

    #[test]
    fn staged_name_round_trips() {
        assert_eq!(parse_staged_name(&staged_name(7)), Some(7));
    }

    #[test]
    fn finalized_naming() {
        let name = finalized_name("120000_010000");
        assert_eq!(name, "cap_120000_010000.raw");
        assert!(is_finalized_name(&name));
        assert!(!is_finalized_name("frame_000001.raw"));
    }

    #[test]
    fn frames_order_by_sequence() {
        let mut frames = vec![
            StagedFrame {
                seq: 9,
                path: PathBuf::from("/tmp/frame_000009.raw"),
            },
            StagedFrame {
                seq: 2,
                path: PathBuf::from("/tmp/frame_000002.raw"),
            },
        ];
        frames.sort();
        assert_eq!(frames[0].seq, 2);
    }

    #[test]
    fn unpack_drops_every_fifth_byte() {
        // 4x1 "frame": 4 pixels packed into 5 bytes
        let packed = [10u8, 20, 30, 40, 0xFF];
        let pixels = unpack_packed10(&packed, 4, 1).expect("unpack");
        assert_eq!(pixels, vec![10, 20, 30, 40]);
    }

    #[test]
    fn unpack_rejects_wrong_byte_count() {
        let short = [0u8; 4];
        let err = unpack_packed10(&short, 4, 1).unwrap_err();
        match err {
            CaptureError::MalformedFrame { expected, actual } => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
