use std::time::Duration;

/// Doubling reconnect delay bounded by `min` and `max`.
///
/// The first delay is `min` (never zero), each further one doubles, and the
/// sequence stays at `max` once it gets there. `reset` starts over after a
/// successful connection.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    attempt: u32,
}

pub const DEFAULT_MIN: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX: Duration = Duration::from_secs(30);

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        let min = min.max(Duration::from_millis(1));
        Self {
            min,
            max: max.max(min),
            attempt: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        let delay = self.min.saturating_mul(factor).min(self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_MIN, DEFAULT_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(3));
        let delays: Vec<_> = (0..6).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![500, 1_000, 2_000, 3_000, 3_000, 3_000]);
    }

    #[test]
    fn never_overflows_or_decreases() {
        let mut backoff = Backoff::default();
        let mut last = Duration::ZERO;
        for _ in 0..100 {
            let delay = backoff.next_delay();
            assert!(delay >= last);
            assert!(delay <= DEFAULT_MAX);
            last = delay;
        }
    }

    #[test]
    fn reset_returns_to_minimum() {
        let mut backoff = Backoff::default();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), DEFAULT_MIN);
    }

    #[test]
    fn zero_minimum_is_raised() {
        let mut backoff = Backoff::new(Duration::ZERO, Duration::ZERO);
        assert!(backoff.next_delay() > Duration::ZERO);
    }
}
