//! Per-frame wall-clock timestamp reconstruction.
//!
//! The producer does not timestamp frames. The only known time in a window
//! is the wall-clock instant the trigger was observed, which belongs to the
//! reference frame. Every other frame's capture time is reconstructed from
//! its signed position offset times the fixed frame interval, carried
//! through microsecond/second/minute/hour fields with a 24-hour wrap.
//!
//! Day rollover is intentionally not tracked: a window spans seconds, and
//! timestamps wrap at midnight while the durable bucket keeps the trigger's
//! date. The arithmetic is integer-exact; two adjacent positions always
//! differ by exactly one frame interval (mod 24 h).

use std::fmt;

const DAY_US: i64 = 86_400_000_000;

/// A time of day with microsecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub micros: u32,
}

impl WallClock {
    pub fn new(hour: u32, minute: u32, second: u32, micros: u32) -> Self {
        Self {
            hour,
            minute,
            second,
            micros,
        }
    }

    /// Capture the time-of-day fields of a chrono time.
    pub fn from_naive_time(t: chrono::NaiveTime) -> Self {
        use chrono::Timelike;
        Self {
            hour: t.hour(),
            minute: t.minute(),
            second: t.second(),
            // nanosecond() exceeds 1e9 during a leap second; clamp rather
            // than produce a micros field that breaks the fixed-width format
            micros: (t.nanosecond() / 1_000).min(999_999),
        }
    }

    fn total_us(self) -> i64 {
        (i64::from(self.hour) * 3_600 + i64::from(self.minute) * 60 + i64::from(self.second))
            * 1_000_000
            + i64::from(self.micros)
    }

    /// This time shifted by a signed microsecond offset.
    ///
    /// Equivalent to repeated carry/borrow across the microsecond, second,
    /// minute and hour fields, with the hour wrapping at 24.
    pub fn offset_by(self, delta_us: i64) -> Self {
        let total = (self.total_us() + delta_us).rem_euclid(DAY_US);
        let micros = (total % 1_000_000) as u32;
        let seconds = total / 1_000_000;
        Self {
            hour: (seconds / 3_600) as u32,
            minute: (seconds / 60 % 60) as u32,
            second: (seconds % 60) as u32,
            micros,
        }
    }
}

impl fmt::Display for WallClock {
    /// Fixed-width `HHMMSS_uuuuuu` form used in finalized artifact names.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}{:02}{:02}_{:06}",
            self.hour, self.minute, self.second, self.micros
        )
    }
}

/// Maps window positions to reconstructed capture times.
#[derive(Debug, Clone, Copy)]
pub struct Reconstructor {
    reference: WallClock,
    reference_pos: usize,
    interval_us: i64,
}

impl Reconstructor {
    /// `reference` is the wall-clock time observed at trigger detection,
    /// belonging to the frame at `reference_pos` in the ordered window.
    pub fn new(reference: WallClock, reference_pos: usize, interval_us: i64) -> Self {
        Self {
            reference,
            reference_pos,
            interval_us,
        }
    }

    /// Reconstructed capture time of the frame at `pos`.
    pub fn timestamp_at(&self, pos: usize) -> WallClock {
        let delta = (pos as i64 - self.reference_pos as i64) * self.interval_us;
        self.reference.offset_by(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_position_keeps_exact_trigger_time() {
        let recon = Reconstructor::new(WallClock::new(12, 0, 0, 0), 100, 5_000);
        assert_eq!(recon.timestamp_at(100), WallClock::new(12, 0, 0, 0));
    }

    #[test]
    fn offsets_around_noon_at_200_fps() {
        // 200 fps => 5000 us interval, reference at position 100
        let recon = Reconstructor::new(WallClock::new(12, 0, 0, 0), 100, 5_000);
        assert_eq!(recon.timestamp_at(98).to_string(), "115959_990000");
        assert_eq!(recon.timestamp_at(102).to_string(), "120000_010000");
    }

    #[test]
    fn microsecond_carry_wraps_through_midnight() {
        // 23:59:59.999000 + 5000 us carries through second, minute and hour
        let recon = Reconstructor::new(WallClock::new(23, 59, 59, 999_000), 0, 5_000);
        assert_eq!(recon.timestamp_at(1).to_string(), "000000_004000");
    }

    #[test]
    fn negative_offset_borrows_through_midnight() {
        let recon = Reconstructor::new(WallClock::new(0, 0, 0, 1_000), 1, 5_000);
        assert_eq!(recon.timestamp_at(0).to_string(), "235959_996000");
    }

    #[test]
    fn adjacent_positions_differ_by_exactly_one_interval() {
        let recon = Reconstructor::new(WallClock::new(7, 41, 3, 123_456), 50, 5_000);
        for pos in 0..200 {
            let a = recon.timestamp_at(pos).total_us();
            let b = recon.timestamp_at(pos + 1).total_us();
            assert_eq!(b.rem_euclid(DAY_US) - a.rem_euclid(DAY_US), 5_000, "at {pos}");
        }
    }

    #[test]
    fn display_is_fixed_width_zero_padded() {
        assert_eq!(WallClock::new(1, 2, 3, 45).to_string(), "010203_000045");
    }

    #[test]
    fn from_naive_time_captures_fields() {
        let t = chrono::NaiveTime::from_hms_micro_opt(14, 30, 15, 250_000).expect("time");
        assert_eq!(WallClock::from_naive_time(t), WallClock::new(14, 30, 15, 250_000));
    }
}
