use crate::timer::PlaybackTimer;
use std::time::Duration;

/// Forward offset applied to every authoritative position. Tuned against the
/// observed delivery lag of the reference player; configurable at runtime.
pub const DEFAULT_COMPENSATION: Duration = Duration::from_millis(140);

/// Turns sparse progress ticks into a position that advances smoothly
/// between them.
#[derive(Debug)]
pub struct ProgressReconciler {
    timer: PlaybackTimer,
    compensation: Duration,
}

impl ProgressReconciler {
    pub fn new(compensation: Duration) -> Self {
        Self {
            timer: PlaybackTimer::new(),
            compensation,
        }
    }

    /// Re-anchor on an authoritative position.
    pub fn on_tick(&mut self, position_ms: u64, paused: bool) {
        let position = Duration::from_millis(position_ms).saturating_add(self.compensation);
        self.timer.set_time(position);
        self.on_paused(paused);
    }

    /// Halt or resume extrapolation right away, without waiting for a tick.
    pub fn on_paused(&mut self, paused: bool) {
        if paused {
            self.timer.pause();
        } else {
            self.timer.start();
        }
    }

    /// Forget the current position, e.g. when a different track is loaded.
    pub fn reset(&mut self) {
        self.timer.reset();
    }

    pub fn current_ms(&self) -> u64 {
        u64::try_from(self.timer.get_time().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }
}

impl Default for ProgressReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_COMPENSATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn tick_applies_compensation_and_extrapolates() {
        let mut reconciler = ProgressReconciler::default();
        reconciler.on_tick(10_000, false);
        assert_eq!(reconciler.current_ms(), 10_140);
        advance(Duration::from_millis(200)).await;
        assert_eq!(reconciler.current_ms(), 10_340);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_tick_holds_position() {
        let mut reconciler = ProgressReconciler::new(Duration::ZERO);
        reconciler.on_tick(5_000, true);
        advance(Duration::from_secs(3)).await;
        assert_eq!(reconciler.current_ms(), 5_000);
        assert!(!reconciler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_toggle_without_tick_stops_immediately() {
        let mut reconciler = ProgressReconciler::new(Duration::ZERO);
        reconciler.on_tick(0, false);
        advance(Duration::from_millis(1_000)).await;
        reconciler.on_paused(true);
        let frozen = reconciler.current_ms();
        advance(Duration::from_millis(1_000)).await;
        assert_eq!(reconciler.current_ms(), frozen);

        reconciler.on_paused(false);
        advance(Duration::from_millis(250)).await;
        assert_eq!(reconciler.current_ms(), frozen + 250);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_backwards_is_a_discontinuity() {
        let mut reconciler = ProgressReconciler::new(Duration::ZERO);
        reconciler.on_tick(60_000, false);
        advance(Duration::from_millis(500)).await;
        reconciler.on_tick(2_000, false);
        assert_eq!(reconciler.current_ms(), 2_000);
    }
}
