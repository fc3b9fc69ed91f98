//! # Fixed Tick Loop
//!
//! Accumulator turning wall-clock or simulated elapsed time into a whole
//! number of fixed ticks. The host always sees the same `dt`.
//!
//! ```text
//! elapsed ──> accumulator ──> n × tick_duration  (remainder carried)
//! ```

use shisha_shared::TICK_RATE;
use std::time::{Duration, Instant};

/// Upper bound on ticks handed out by one `advance` call.
pub const MAX_CATCH_UP_TICKS: u32 = 8;

/// Fixed-timestep controller.
pub struct TickLoop {
    /// Target tick duration.
    tick_duration: Duration,
    /// Time not yet turned into ticks.
    accumulator: Duration,
    /// Total ticks handed out.
    tick_count: u64,
    /// Frame time statistics.
    stats: TickStats,
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Minimum tick duration observed.
    pub min_tick_us: u64,
    /// Maximum tick duration observed.
    pub max_tick_us: u64,
    /// Average tick duration (rolling).
    pub avg_tick_us: u64,
    /// Ticks that took longer than their budget.
    pub late_ticks: u64,
    /// Ticks measured.
    pub total_ticks: u64,
    /// Ticks dropped because the loop fell too far behind.
    pub dropped_ticks: u64,
}

impl TickStats {
    fn fresh(tick_duration: Duration) -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: micros(tick_duration),
            late_ticks: 0,
            total_ticks: 0,
            dropped_ticks: 0,
        }
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl TickLoop {
    /// Loop running `tick_rate` ticks per second. A rate of zero is treated
    /// as one.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_duration = Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)));
        Self {
            tick_duration,
            accumulator: Duration::ZERO,
            tick_count: 0,
            stats: TickStats::fresh(tick_duration),
        }
    }

    /// Adds `elapsed` and returns how many ticks are now due. Anything past
    /// [`MAX_CATCH_UP_TICKS`] is dropped instead of queued.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed;
        let mut due = 0;
        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            if due == MAX_CATCH_UP_TICKS {
                self.stats.dropped_ticks += 1;
                continue;
            }
            due += 1;
        }
        self.tick_count += u64::from(due);
        due
    }

    /// Marks the start of a tick's work.
    #[must_use]
    pub fn begin_tick(&self) -> Instant {
        Instant::now()
    }

    /// Records how long the tick started at `start` took.
    pub fn end_tick(&mut self, start: Instant) {
        let duration = start.elapsed();
        let duration_us = micros(duration);

        self.stats.total_ticks += 1;
        self.stats.min_tick_us = self.stats.min_tick_us.min(duration_us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(duration_us);
        self.stats.avg_tick_us = (self.stats.avg_tick_us * 15 + duration_us) / 16;

        if duration > self.tick_duration {
            self.stats.late_ticks += 1;
        }
    }

    /// Ticks handed out so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Tick statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Tick duration in seconds, as handed to the host.
    #[must_use]
    pub fn tick_seconds(&self) -> f32 {
        self.tick_duration.as_secs_f32()
    }

    /// Resets statistics.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::fresh(self.tick_duration);
    }
}

impl Default for TickLoop {
    fn default() -> Self {
        Self::new(TICK_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_loop_creation() {
        let tick_loop = TickLoop::new(60);
        assert_eq!(tick_loop.tick_count(), 0);
        assert_eq!(tick_loop.tick_duration(), Duration::from_micros(16666));
    }

    #[test]
    fn test_remainder_carries_over() {
        let mut tick_loop = TickLoop::new(10);
        assert_eq!(tick_loop.advance(Duration::from_millis(150)), 1);
        assert_eq!(tick_loop.advance(Duration::from_millis(50)), 1);
        assert_eq!(tick_loop.advance(Duration::from_millis(99)), 0);
        assert_eq!(tick_loop.tick_count(), 2);
    }

    #[test]
    fn test_catch_up_is_bounded() {
        let mut tick_loop = TickLoop::new(10);
        assert_eq!(tick_loop.advance(Duration::from_secs(2)), MAX_CATCH_UP_TICKS);
        assert_eq!(tick_loop.stats().dropped_ticks, 12);
        assert_eq!(tick_loop.advance(Duration::ZERO), 0);
    }

    #[test]
    fn test_stats_tracking() {
        let mut tick_loop = TickLoop::new(1000);
        for _ in 0..5 {
            let start = tick_loop.begin_tick();
            std::thread::sleep(Duration::from_micros(50));
            tick_loop.end_tick(start);
        }
        let stats = tick_loop.stats();
        assert_eq!(stats.total_ticks, 5);
        assert!(stats.min_tick_us > 0);
        assert!(stats.min_tick_us <= stats.max_tick_us);
    }
}
