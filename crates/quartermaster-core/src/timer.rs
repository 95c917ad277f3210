//! Tick-based cooldown timers.
//!
//! All timing in the staging machine is measured in ticks of the external
//! poll loop, never wall-clock time, so a paused or slowed host slows the
//! timers with it.

/// A cooldown of fixed length, started at a given tick.
///
/// A timer that was never started (or was reset) counts as elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    duration: u64,
    started_at: Option<u64>,
}

impl Cooldown {
    /// A stopped cooldown of `duration` ticks.
    pub const fn new(duration: u64) -> Self {
        Self {
            duration,
            started_at: None,
        }
    }

    /// Start (or restart) the cooldown at `now`.
    pub const fn start(&mut self, now: u64) {
        self.started_at = Some(now);
    }

    /// Stop the cooldown.
    pub const fn reset(&mut self) {
        self.started_at = None;
    }

    /// Whether the cooldown has run its course by `now`.
    pub const fn elapsed(&self, now: u64) -> bool {
        match self.started_at {
            Some(start) => now.saturating_sub(start) >= self.duration,
            None => true,
        }
    }

    /// Ticks left before the cooldown elapses.
    pub const fn remaining(&self, now: u64) -> u64 {
        match self.started_at {
            Some(start) => self.duration.saturating_sub(now.saturating_sub(start)),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstarted_cooldown_is_elapsed() {
        let cd = Cooldown::new(60);
        assert!(cd.elapsed(0));
        assert_eq!(cd.remaining(0), 0);
    }

    #[test]
    fn elapses_after_duration() {
        let mut cd = Cooldown::new(60);
        cd.start(100);
        assert!(!cd.elapsed(159));
        assert_eq!(cd.remaining(130), 30);
        assert!(cd.elapsed(160));
    }

    #[test]
    fn reset_stops_the_timer() {
        let mut cd = Cooldown::new(60);
        cd.start(10);
        cd.reset();
        assert!(cd.elapsed(11));
    }

    #[test]
    fn clock_going_backwards_does_not_elapse() {
        let mut cd = Cooldown::new(5);
        cd.start(100);
        assert!(!cd.elapsed(50));
    }
}
