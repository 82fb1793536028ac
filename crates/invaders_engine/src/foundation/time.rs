//! Fixed-rate loop pacing
//!
//! The game advances exactly one simulation step per loop iteration and then
//! sleeps a fixed delay. There is no catch-up or sub-stepping: a slow frame
//! simply makes that iteration longer.

use std::time::{Duration, Instant};

/// Paces a loop with a constant sleep after every iteration
pub struct FixedTicker {
    delay: Duration,
    last_tick: Instant,
    last_frame_time: Duration,
    tick_count: u64,
}

impl FixedTicker {
    /// Create a ticker that sleeps `delay` once per iteration
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_tick: Instant::now(),
            last_frame_time: Duration::ZERO,
            tick_count: 0,
        }
    }

    /// Create a ticker from a delay in milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Sleep the fixed delay and record how long the whole iteration took
    pub fn wait(&mut self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let now = Instant::now();
        self.last_frame_time = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.tick_count += 1;

        if self.tick_count % 500 == 0 {
            log::debug!(
                "tick {}: last iteration took {:.2} ms",
                self.tick_count,
                self.last_frame_time.as_secs_f64() * 1000.0
            );
        }
    }

    /// Configured delay between iterations
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wall-clock duration of the previous iteration, sleep included
    pub fn last_frame_time(&self) -> Duration {
        self.last_frame_time
    }

    /// Number of completed iterations
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_counts_iterations() {
        let mut ticker = FixedTicker::from_millis(0);
        ticker.wait();
        ticker.wait();
        assert_eq!(ticker.tick_count(), 2);
        assert!(ticker.delay().is_zero());
    }

    #[test]
    fn test_ticker_sleeps_at_least_delay() {
        let mut ticker = FixedTicker::from_millis(5);
        ticker.wait();
        assert!(ticker.last_frame_time() >= Duration::from_millis(5));
    }
}
