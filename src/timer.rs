use std::time::Duration;
use tokio::time::Instant;

/// Pausable elapsed-time tracker used as the only clock for position
/// extrapolation.
///
/// Built on the monotonic `tokio::time::Instant`, so wall-clock adjustments
/// never move it and paused test runtimes can drive it deterministically.
#[derive(Debug, PartialEq, Default)]
pub struct PlaybackTimer {
    /// Time accumulated by completed cycles plus explicit `set_time` jumps.
    base: Duration,
    /// Start of the running cycle. `None` while paused.
    cycle_start: Option<Instant>,
}

impl PlaybackTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.cycle_start.is_some()
    }

    /// Begin a new accumulation cycle. No-op while already running.
    pub fn start(&mut self) {
        if self.cycle_start.is_none() {
            self.cycle_start = Some(Instant::now());
        }
    }

    /// Fold the running cycle into the base and stop. No-op while paused.
    pub fn pause(&mut self) {
        if let Some(since) = self.cycle_start.take() {
            self.base = self.base.saturating_add(since.elapsed());
        }
    }

    pub fn get_time(&self) -> Duration {
        match self.cycle_start {
            Some(since) => self.base.saturating_add(since.elapsed()),
            None => self.base,
        }
    }

    /// Jump to `time`. A running timer keeps running from the new value.
    pub fn set_time(&mut self, time: Duration) {
        self.base = time;
        if self.cycle_start.is_some() {
            self.cycle_start = Some(Instant::now());
        }
    }

    pub fn reset(&mut self) {
        self.base = Duration::ZERO;
        self.cycle_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    const MS: Duration = Duration::from_millis(1);

    #[tokio::test(start_paused = true)]
    async fn accumulates_only_while_running() {
        let mut timer = PlaybackTimer::new();
        advance(100 * MS).await;
        assert_eq!(timer.get_time(), Duration::ZERO);

        timer.start();
        advance(250 * MS).await;
        assert_eq!(timer.get_time(), 250 * MS);

        timer.pause();
        advance(1000 * MS).await;
        assert_eq!(timer.get_time(), 250 * MS);

        timer.start();
        advance(50 * MS).await;
        assert_eq!(timer.get_time(), 300 * MS);
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_pause_are_idempotent() {
        let mut timer = PlaybackTimer::new();
        timer.start();
        advance(100 * MS).await;
        // A second start must not restart the cycle.
        timer.start();
        advance(100 * MS).await;
        assert_eq!(timer.get_time(), 200 * MS);

        timer.pause();
        timer.pause();
        assert_eq!(timer.get_time(), 200 * MS);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn get_time_is_non_decreasing_while_running() {
        let mut timer = PlaybackTimer::new();
        timer.start();
        let mut last = timer.get_time();
        for step in [1u32, 7, 16, 0, 33, 2] {
            advance(step * MS).await;
            let now = timer.get_time();
            assert!(now >= last);
            last = now;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn set_time_while_paused_is_exact() {
        let mut timer = PlaybackTimer::new();
        timer.set_time(10_140 * MS);
        advance(500 * MS).await;
        assert_eq!(timer.get_time(), 10_140 * MS);
    }

    #[tokio::test(start_paused = true)]
    async fn set_time_while_running_continues_from_new_value() {
        let mut timer = PlaybackTimer::new();
        timer.start();
        advance(5_000 * MS).await;
        timer.set_time(1_000 * MS);
        assert_eq!(timer.get_time(), 1_000 * MS);
        advance(200 * MS).await;
        assert_eq!(timer.get_time(), 1_200 * MS);
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_zeroes_and_stops() {
        let mut timer = PlaybackTimer::new();
        timer.start();
        advance(300 * MS).await;
        timer.reset();
        advance(300 * MS).await;
        assert_eq!(timer.get_time(), Duration::ZERO);
        assert!(!timer.is_running());
    }
}
