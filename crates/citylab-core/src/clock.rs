//! Simulation clock: maps tick numbers to simulated time.
//!
//! One tick is one simulated minute. Hour-of-day and day are derived from
//! the tick counter, never stored.

use chrono::{DateTime, TimeDelta, Utc};

/// Ticks per simulated hour.
pub const TICKS_PER_HOUR: u64 = 60;

/// Ticks per simulated day.
pub const TICKS_PER_DAY: u64 = 1440;

const HOURS_PER_DAY: u64 = 24;

/// Converts ticks into simulated time from a fixed start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    start_time: DateTime<Utc>,
}

impl SimulationClock {
    /// A clock whose tick 0 is `start_time`.
    pub const fn new(start_time: DateTime<Utc>) -> Self {
        Self { start_time }
    }

    /// Simulated time at tick 0.
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Hour of day, `(tick / 60) mod 24`.
    pub fn hour(tick: u64) -> u32 {
        let hour = tick
            .checked_div(TICKS_PER_HOUR)
            .and_then(|hours| hours.checked_rem(HOURS_PER_DAY))
            .unwrap_or(0);
        u32::try_from(hour).unwrap_or(0)
    }

    /// Day index, `tick / 1440`.
    pub fn day(tick: u64) -> u64 {
        tick.checked_div(TICKS_PER_DAY).unwrap_or(0)
    }

    /// Whether `tick` starts a simulated hour.
    pub fn is_hour_boundary(tick: u64) -> bool {
        tick.checked_rem(TICKS_PER_HOUR) == Some(0)
    }

    /// Simulated time at `tick`, saturating at the latest representable
    /// instant.
    pub fn time_at(&self, tick: u64) -> DateTime<Utc> {
        i64::try_from(tick)
            .ok()
            .and_then(TimeDelta::try_minutes)
            .and_then(|elapsed| self.start_time.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Ticks in a horizon of `days`.
    pub fn ticks_for_days(days: u32) -> Option<u64> {
        u64::from(days).checked_mul(TICKS_PER_DAY)
    }
}
