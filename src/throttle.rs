//! Load-adaptive decimation of accumulator update notifications.

use std::time::Duration;

use tokio::time::Instant;

/// Notification interval of a single active generation, about 12 per second.
pub const BASELINE_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 12);

/// Decides which per-particle updates reach the observer.
///
/// With `N` parallel generations each instance spaces its notifications by
/// `BASELINE_INTERVAL * sqrt(N)`, so the aggregate rate grows with `sqrt(N)`.
/// A level of `0` turns decimation off.
#[derive(Debug)]
pub struct Throttle {
    interval: Option<Duration>,
    last_emit: Option<Instant>,
    pending: bool,
}

impl Throttle {
    pub fn new(parallel_threads: u32) -> Self {
        let interval = (parallel_threads > 0)
            .then(|| BASELINE_INTERVAL.mul_f64(f64::from(parallel_threads).sqrt()));
        Self {
            interval,
            last_emit: None,
            pending: false,
        }
    }

    /// Minimum spacing between two notifications, `None` when unthrottled.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Called once per processed particle. Returns whether `emit` ran.
    pub fn decimate(&mut self, emit: impl FnOnce()) -> bool {
        self.decimate_at(Instant::now(), emit)
    }

    /// [`decimate`](Self::decimate) against an explicit clock reading.
    pub fn decimate_at(&mut self, now: Instant, emit: impl FnOnce()) -> bool {
        let Some(interval) = self.interval else {
            emit();
            return true;
        };

        let due = self
            .last_emit
            .map_or(true, |last| now.saturating_duration_since(last) >= interval);
        if due {
            self.last_emit = Some(now);
            self.pending = false;
            emit();
        } else {
            self.pending = true;
        }
        due
    }

    /// When a suppressed update should be delivered if no further particle arrives.
    pub fn pending_deadline(&self) -> Option<Instant> {
        if !self.pending {
            return None;
        }
        Some(self.last_emit? + self.interval?)
    }

    /// Deliver a suppressed update, if any. Returns whether `emit` ran.
    pub fn flush(&mut self, emit: impl FnOnce()) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;
        self.last_emit = Some(Instant::now());
        emit();
        true
    }

    /// Unconditionally deliver the final state.
    pub fn finalize(&mut self, emit: impl FnOnce()) {
        self.pending = false;
        tracing::trace!("throttle finalize");
        emit();
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emissions over one simulated second with a particle every millisecond.
    fn emissions_per_second(parallel_threads: u32) -> usize {
        let mut throttle = Throttle::new(parallel_threads);
        let start = Instant::now();
        let mut emitted = 0;
        for ms in 0..1000 {
            throttle.decimate_at(start + Duration::from_millis(ms), || emitted += 1);
        }
        emitted
    }

    #[test]
    fn test_level_zero_emits_every_particle() {
        assert_eq!(emissions_per_second(0), 1000);
        assert!(Throttle::new(0).interval().is_none());
    }

    #[test]
    fn test_single_stream_rate() {
        let emitted = emissions_per_second(1);
        assert!((11..=13).contains(&emitted), "emitted {emitted}");
    }

    #[test]
    fn test_rate_dampens_with_parallelism() {
        let counts: Vec<usize> = [1, 2, 3, 4, 8, 16, 64]
            .into_iter()
            .map(emissions_per_second)
            .collect();
        for pair in counts.windows(2) {
            assert!(pair[0] >= pair[1], "not monotonic: {counts:?}");
        }
        assert!(counts[0] > counts[counts.len() - 1]);
    }

    #[test]
    fn test_first_particle_emits_immediately() {
        let mut throttle = Throttle::new(4);
        let mut emitted = false;
        assert!(throttle.decimate(|| emitted = true));
        assert!(emitted);
        assert!(throttle.pending_deadline().is_none());
    }

    #[test]
    fn test_suppressed_update_sets_deadline_and_flushes() {
        let mut throttle = Throttle::new(1);
        let start = Instant::now();
        throttle.decimate_at(start, || {});
        assert!(!throttle.decimate_at(start + Duration::from_millis(10), || {
            panic!("should be suppressed")
        }));

        assert_eq!(throttle.pending_deadline(), Some(start + BASELINE_INTERVAL));

        let mut flushed = 0;
        assert!(throttle.flush(|| flushed += 1));
        assert!(!throttle.flush(|| flushed += 1));
        assert_eq!(flushed, 1);
        assert!(throttle.pending_deadline().is_none());
    }

    #[test]
    fn test_finalize_always_emits_once() {
        for level in [0, 1, 2, 16] {
            let mut throttle = Throttle::new(level);
            let mut emitted = 0;
            throttle.finalize(|| emitted += 1);
            assert_eq!(emitted, 1);

            // even right after an emission inside the window
            let mut throttle = Throttle::new(level);
            throttle.decimate(|| {});
            let mut emitted = 0;
            throttle.finalize(|| emitted += 1);
            assert_eq!(emitted, 1);
        }
    }
}
